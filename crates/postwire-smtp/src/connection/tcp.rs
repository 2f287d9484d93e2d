//! TCP implementation of [`LineChannel`].

use std::io;

use tracing::{debug, trace, warn};

use super::{ChannelConfig, LineChannel, Security, SmtpStream};
use crate::error::{Error, Result};
use crate::parser::{ReplyBuffer, status_code};
use crate::types::ReplyCode;

/// Line channel over a TCP (optionally TLS) connection.
///
/// An exchange that is dropped before its reply has been read completely
/// (for example by a timeout) leaves unread bytes on the connection. The
/// channel then refuses further commands with [`Error::InvalidState`] and
/// drops the connection; reconnect to continue.
#[derive(Debug)]
pub struct TcpChannel {
    config: ChannelConfig,
    stream: Option<SmtpStream>,
    /// Set while a command is awaiting its reply.
    pending: bool,
}

impl TcpChannel {
    /// Creates an unconnected channel.
    #[must_use]
    pub const fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            stream: None,
            pending: false,
        }
    }

    /// Returns the channel configuration.
    #[must_use]
    pub const fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Returns true while a connection is open and in sync with the server.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.stream.is_some() && !self.pending
    }

    /// Returns true if the open connection is encrypted.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.stream.as_ref().is_some_and(SmtpStream::is_tls)
    }

    /// Drops a connection whose last exchange never completed.
    fn check_interrupted(&mut self) -> Result<()> {
        if self.pending {
            self.pending = false;
            self.stream = None;
            warn!("Previous exchange was interrupted, connection dropped");
            return Err(Error::InvalidState(
                "previous exchange was interrupted; reconnect".into(),
            ));
        }
        Ok(())
    }
}

fn not_connected() -> Error {
    Error::InvalidState("channel is not connected".into())
}

/// Reads lines until a final reply line arrives.
async fn read_reply(stream: &mut SmtpStream, reply: &mut ReplyBuffer) -> Result<ReplyCode> {
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }
        trace!(line = %line, "S:");

        let code = status_code(&line)?;
        reply.push(line);

        if reply.is_complete() {
            return Ok(code);
        }
    }
}

impl LineChannel for TcpChannel {
    async fn connect(&mut self, reply: &mut ReplyBuffer) -> Result<ReplyCode> {
        if self.pending {
            self.pending = false;
            self.stream = None;
        }
        if self.stream.is_some() {
            return Err(Error::InvalidState("channel is already connected".into()));
        }

        let ChannelConfig {
            host,
            port,
            security,
            ..
        } = &self.config;
        debug!(%host, port, ?security, "Connecting");
        let mut stream = match security {
            Security::Plain => SmtpStream::connect(host, *port).await?,
            Security::Implicit => {
                SmtpStream::connect_tls(host, *port, self.config.server_name()).await?
            }
        };

        let code = read_reply(&mut stream, reply).await?;
        self.stream = Some(stream);
        Ok(code)
    }

    async fn write(&mut self, command: &str, reply: &mut ReplyBuffer) -> Result<ReplyCode> {
        self.check_interrupted()?;
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;

        self.pending = true;
        let result = match stream.write_all(command.as_bytes()).await {
            Ok(()) => read_reply(stream, reply).await,
            Err(err) => Err(err),
        };
        self.pending = false;

        if result.is_err() {
            // The rest of the reply is unknown; the connection cannot be reused
            self.stream = None;
        }
        result
    }

    async fn negotiate_tls(&mut self) -> Result<()> {
        self.check_interrupted()?;
        let stream = self.stream.take().ok_or_else(not_connected)?;
        let server_name = self.config.server_name().to_string();
        self.stream = Some(stream.upgrade_to_tls(&server_name).await?);
        debug!(%server_name, "TLS established");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.pending = false;
        if let Some(mut stream) = self.stream.take() {
            match stream.shutdown().await {
                // The server may already have dropped the connection after QUIT
                Err(Error::Io(err)) if err.kind() == io::ErrorKind::NotConnected => {}
                result => result?,
            }
            debug!("Connection closed");
        }
        Ok(())
    }
}
