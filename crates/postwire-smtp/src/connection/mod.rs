//! SMTP connection management.
//!
//! [`Client`] sequences commands over any [`LineChannel`]. [`TcpChannel`] is
//! the bundled channel over TCP, with optional implicit TLS and STARTTLS.

mod client;
mod config;
mod stream;
mod tcp;

pub use client::Client;
pub use config::{ChannelConfig, ChannelConfigBuilder, Security};
pub use stream::SmtpStream;
pub use tcp::TcpChannel;

use std::future::Future;

use crate::error::Result;
use crate::parser::ReplyBuffer;
use crate::types::ReplyCode;

/// Line-oriented transport the client talks through.
///
/// Every method that reads a reply pushes each received line into `reply`
/// in arrival order and resolves with the code of the final line. Timeouts
/// are applied by the caller around the returned futures.
pub trait LineChannel: Send {
    /// Opens the connection and reads the server greeting.
    fn connect(&mut self, reply: &mut ReplyBuffer)
    -> impl Future<Output = Result<ReplyCode>> + Send;

    /// Writes a raw, CRLF-terminated command and reads the reply to it.
    fn write(
        &mut self,
        command: &str,
        reply: &mut ReplyBuffer,
    ) -> impl Future<Output = Result<ReplyCode>> + Send;

    /// Performs the TLS handshake on the open connection.
    fn negotiate_tls(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Closes the connection.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
