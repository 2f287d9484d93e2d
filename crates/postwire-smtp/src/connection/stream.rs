//! Low-level SMTP stream handling.

use std::io;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

use crate::error::{Error, Result};

/// SMTP stream (TCP or TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Tcp(BufReader<TcpStream>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<tokio_rustls::client::TlsStream<TcpStream>>>),
}

impl SmtpStream {
    /// Opens a plain TCP connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        Ok(Self::Tcp(BufReader::new(stream)))
    }

    /// Opens a TCP connection and immediately performs the TLS handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or TLS handshake fails.
    pub async fn connect_tls(host: &str, port: u16, server_name: &str) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        let tls_stream = handshake(stream, server_name).await?;
        Ok(Self::Tls(Box::new(BufReader::new(tls_stream))))
    }

    /// Reads one line with the trailing CRLF removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the peer closed the connection.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = match self {
            Self::Tcp(reader) => reader.read_line(&mut line).await?,
            Self::Tls(reader) => reader.read_line(&mut line).await?,
        };
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )
            .into());
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes data to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Tcp(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Self::Tls(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
        }
        Ok(())
    }

    /// Upgrades a TCP stream to TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already encrypted or the TLS
    /// handshake fails.
    pub async fn upgrade_to_tls(self, server_name: &str) -> Result<Self> {
        let tcp_stream = match self {
            Self::Tcp(reader) => reader.into_inner(),
            Self::Tls(_) => return Err(Error::InvalidState("Already using TLS".into())),
        };

        let tls_stream = handshake(tcp_stream, server_name).await?;
        Ok(Self::Tls(Box::new(BufReader::new(tls_stream))))
    }

    /// Returns true if the stream is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Shuts down the write half of the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub async fn shutdown(&mut self) -> Result<()> {
        match self {
            Self::Tcp(reader) => reader.get_mut().shutdown().await?,
            Self::Tls(reader) => reader.get_mut().shutdown().await?,
        }
        Ok(())
    }
}

async fn handshake(
    stream: TcpStream,
    server_name: &str,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let connector = create_tls_connector();
    let server_name = ServerName::try_from(server_name.to_string())?;
    Ok(connector.connect(server_name, stream).await?)
}

/// Creates a TLS connector with the Mozilla root certificates.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
