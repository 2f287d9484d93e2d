//! SMTP client: one method per command verb.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::LineChannel;
use crate::command::{Command, client_hostname, dot_stuff, login_token, plain_credentials};
use crate::error::{Error, Result};
use crate::parser::{self, ReplyBuffer};
use crate::types::{AuthMechanism, Capabilities, ReplyCode};

/// Challenge the server sends for the user name during AUTH LOGIN.
const LOGIN_USERNAME_CHALLENGE: &str = "334 VXNlcm5hbWU6";
/// Challenge the server sends for the password during AUTH LOGIN.
const LOGIN_PASSWORD_CHALLENGE: &str = "334 UGFzc3dvcmQ6";

/// SMTP client over a [`LineChannel`].
///
/// The client is a thin sequencer: it sends one command at a time, checks the
/// reply class, and keeps the capabilities advertised by the last successful
/// EHLO. Ordering commands correctly is up to the caller.
///
/// Every exchange takes an optional timeout; `None` waits indefinitely. A
/// negative reply becomes [`Error::Reply`]. Missing capabilities are reported
/// as [`Error::NotSupported`] before anything is written.
#[derive(Debug)]
pub struct Client<C> {
    channel: C,
    capabilities: Capabilities,
}

impl<C: LineChannel> Client<C> {
    /// Creates a client over an unconnected channel.
    #[must_use]
    pub const fn new(channel: C) -> Self {
        Self {
            channel,
            capabilities: Capabilities::new(),
        }
    }

    /// Returns the channel.
    #[must_use]
    pub const fn channel(&self) -> &C {
        &self.channel
    }

    /// Returns the channel mutably.
    pub const fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Consumes the client and returns the channel.
    #[must_use]
    pub fn into_inner(self) -> C {
        self.channel
    }

    /// Returns the capabilities recorded from the last EHLO.
    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Checks if the server advertised the extension `name` (case-sensitive).
    #[must_use]
    pub fn has_extension(&self, name: &str) -> bool {
        self.capabilities.has(name)
    }

    /// Returns the advertised message size limit in bytes, `0` if none.
    #[must_use]
    pub fn data_size_limit(&self) -> usize {
        self.capabilities.size_limit()
    }

    /// Returns the advertised AUTH mechanisms, upper-cased.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<String> {
        self.capabilities.auth_mechanisms()
    }

    /// Returns the enhanced status code token of `line`, if the server
    /// advertised `ENHANCEDSTATUSCODES`.
    #[must_use]
    pub fn parse_enhanced_reply_code<'a>(&self, line: &'a str) -> Option<&'a str> {
        parser::enhanced_code(line, self.enhanced_codes())
    }

    /// Returns the text part of `line` under the current capabilities.
    #[must_use]
    pub fn parse_reply_text<'a>(&self, line: &'a str) -> &'a str {
        parser::reply_text(line, self.enhanced_codes())
    }

    /// Connects and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the greeting is not 2xx.
    pub async fn connect(&mut self, timeout: Option<Duration>) -> Result<ReplyCode> {
        let mut reply = ReplyBuffer::new();
        let code = with_timeout(timeout, self.channel.connect(&mut reply)).await?;
        if !code.is_success() {
            return Err(self.refused(&reply, code));
        }
        debug!(%code, "Connected");
        Ok(code)
    }

    /// Sends HELO. `None` announces the local host name.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the greeting.
    pub async fn helo(
        &mut self,
        hostname: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<ReplyCode> {
        let hostname = hostname.map_or_else(client_hostname, str::to_string);
        self.execute(&Command::Helo { hostname }, timeout).await
    }

    /// Sends EHLO and replaces the capability set with the advertised
    /// extensions. `None` announces the local host name.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the greeting. The capability
    /// set is left untouched in that case.
    pub async fn ehlo(
        &mut self,
        hostname: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<ReplyCode> {
        let hostname = hostname.map_or_else(client_hostname, str::to_string);
        let (code, reply) = self.exchange(&Command::Ehlo { hostname }, timeout).await?;
        if !code.is_success() {
            return Err(self.refused(&reply, code));
        }

        // EHLO replies never carry enhanced codes (RFC 2034)
        self.capabilities = Capabilities::from_lines(
            reply
                .lines()
                .iter()
                .skip(1)
                .map(|line| parser::reply_text(line, false)),
        );
        debug!(count = self.capabilities.len(), "Capabilities updated");
        Ok(code)
    }

    /// Sends EHLO, falling back to HELO if the server refuses EHLO.
    ///
    /// After a HELO fallback the capability set is empty.
    ///
    /// # Errors
    ///
    /// Returns the HELO error if both greetings are refused. Any other EHLO
    /// failure (timeout, I/O, malformed reply) is returned without trying
    /// HELO, since the EHLO reply may still be pending on the channel.
    pub async fn greet(
        &mut self,
        hostname: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<ReplyCode> {
        match self.ehlo(hostname, timeout).await {
            Ok(code) => Ok(code),
            Err(err @ Error::Reply(_)) => {
                warn!(error = %err, "EHLO refused, falling back to HELO");
                let code = self.helo(hostname, timeout).await?;
                self.capabilities.clear();
                Ok(code)
            }
            Err(err) => Err(err),
        }
    }

    /// Sends `MAIL FROM`. With `utf8` the SMTPUTF8 parameter is added, which
    /// requires the server to advertise `SMTPUTF8`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if `utf8` is requested without server
    /// support, or an error if the server rejects the sender.
    pub async fn mail(
        &mut self,
        from: &str,
        utf8: bool,
        timeout: Option<Duration>,
    ) -> Result<ReplyCode> {
        if utf8 && !self.has_extension("SMTPUTF8") {
            return Err(Error::NotSupported("UTF8 mailboxes (SMTPUTF8)".into()));
        }
        let cmd = Command::MailFrom {
            from: from.to_string(),
            smtp_utf8: utf8,
        };
        self.execute(&cmd, timeout).await
    }

    /// Sends `RCPT TO`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the recipient.
    pub async fn rcpt(&mut self, to: &str, timeout: Option<Duration>) -> Result<ReplyCode> {
        let cmd = Command::RcptTo { to: to.to_string() };
        self.execute(&cmd, timeout).await
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// Returns an error if the server replies negatively.
    pub async fn noop(&mut self, timeout: Option<Duration>) -> Result<ReplyCode> {
        self.execute(&Command::Noop, timeout).await
    }

    /// Sends RSET, aborting the current transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the server replies negatively.
    pub async fn rset(&mut self, timeout: Option<Duration>) -> Result<ReplyCode> {
        self.execute(&Command::Rset, timeout).await
    }

    /// Sends QUIT.
    ///
    /// # Errors
    ///
    /// Returns an error if the server replies negatively.
    pub async fn quit(&mut self, timeout: Option<Duration>) -> Result<ReplyCode> {
        self.execute(&Command::Quit, timeout).await
    }

    /// Sends DATA followed by the dot-stuffed message body.
    ///
    /// `source_size` is checked against the advertised `SIZE` limit before
    /// anything is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if the declared size exceeds the
    /// limit, or an error if DATA is not answered with 3xx or the message is
    /// not accepted.
    pub async fn data(
        &mut self,
        source: &str,
        source_size: Option<usize>,
        timeout: Option<Duration>,
    ) -> Result<ReplyCode> {
        let limit = self.data_size_limit();
        if let Some(size) = source_size
            && limit > 0
            && size > limit
        {
            return Err(Error::MessageTooLarge { size, limit });
        }

        let (code, reply) = self.exchange(&Command::Data, timeout).await?;
        if !code.is_intermediate() {
            return Err(self.refused(&reply, code));
        }

        let (code, reply) = self
            .exchange_raw("DATA-BODY", &dot_stuff(source), timeout)
            .await?;
        if !code.is_success() {
            return Err(self.refused(&reply, code));
        }
        Ok(code)
    }

    /// Sends STARTTLS and upgrades the channel to TLS.
    ///
    /// The capability set is cleared once the handshake completes; greet the
    /// server again to learn the post-TLS capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] without `STARTTLS`, or an error if the
    /// server refuses or the handshake fails.
    pub async fn secure(&mut self, timeout: Option<Duration>) -> Result<ReplyCode> {
        if !self.has_extension("STARTTLS") {
            return Err(Error::NotSupported("TLS (STARTTLS)".into()));
        }

        let code = self.execute(&Command::StartTls, timeout).await?;
        with_timeout(timeout, self.channel.negotiate_tls()).await?;
        self.capabilities.clear();
        Ok(code)
    }

    /// Authenticates with AUTH PLAIN (RFC 4616).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if PLAIN is not advertised, or an
    /// error if the credentials are rejected.
    pub async fn auth_plain(
        &mut self,
        username: &str,
        password: &str,
        timeout: Option<Duration>,
    ) -> Result<ReplyCode> {
        self.require_auth(AuthMechanism::Plain)?;
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(plain_credentials(username, password)),
        };
        self.execute(&cmd, timeout).await
    }

    /// Authenticates with AUTH LOGIN.
    ///
    /// The server must answer with exactly the standard `Username:` and
    /// `Password:` challenges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if LOGIN is not advertised, or an
    /// error built from the lines of the failing step.
    pub async fn auth_login(
        &mut self,
        username: &str,
        password: &str,
        timeout: Option<Duration>,
    ) -> Result<ReplyCode> {
        self.require_auth(AuthMechanism::Login)?;

        let cmd = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        let (code, reply) = self.exchange(&cmd, timeout).await?;
        if reply.first() != Some(LOGIN_USERNAME_CHALLENGE) {
            return Err(self.refused(&reply, code));
        }

        let cmd = Command::AuthResponse(login_token(username));
        let (code, reply) = self.exchange(&cmd, timeout).await?;
        if reply.first() != Some(LOGIN_PASSWORD_CHALLENGE) {
            return Err(self.refused(&reply, code));
        }

        let cmd = Command::AuthResponse(login_token(password));
        self.execute(&cmd, timeout).await
    }

    /// Closes the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel fails to close.
    pub async fn close(&mut self) -> Result<()> {
        self.channel.close().await
    }

    fn enhanced_codes(&self) -> bool {
        self.capabilities.has("ENHANCEDSTATUSCODES")
    }

    fn require_auth(&self, mechanism: AuthMechanism) -> Result<()> {
        if self.capabilities.supports_auth(mechanism) {
            Ok(())
        } else {
            Err(Error::NotSupported(format!(
                "the {} authentication mechanism",
                mechanism.as_str()
            )))
        }
    }

    fn refused(&self, reply: &ReplyBuffer, code: ReplyCode) -> Error {
        parser::reply_error(reply.lines(), self.enhanced_codes(), code).into()
    }

    /// Sends a command and requires a 2xx reply.
    async fn execute(&mut self, cmd: &Command, timeout: Option<Duration>) -> Result<ReplyCode> {
        let (code, reply) = self.exchange(cmd, timeout).await?;
        if !code.is_success() {
            return Err(self.refused(&reply, code));
        }
        Ok(code)
    }

    async fn exchange(
        &mut self,
        cmd: &Command,
        timeout: Option<Duration>,
    ) -> Result<(ReplyCode, ReplyBuffer)> {
        self.exchange_raw(cmd.verb(), &cmd.serialize(), timeout).await
    }

    async fn exchange_raw(
        &mut self,
        verb: &str,
        wire: &str,
        timeout: Option<Duration>,
    ) -> Result<(ReplyCode, ReplyBuffer)> {
        debug!(command = verb, "C:");
        let mut reply = ReplyBuffer::new();
        let code = with_timeout(timeout, self.channel.write(wire, &mut reply)).await?;
        debug!(command = verb, %code, lines = reply.lines().len(), "S:");
        Ok((code, reply))
    }
}

/// Awaits `fut`, failing with [`Error::Timeout`] once `timeout` elapses.
async fn with_timeout<T, F>(timeout: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(limit))?,
        None => fut.await,
    }
}
