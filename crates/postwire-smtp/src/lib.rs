//! # postwire-smtp
//!
//! The command/response engine of an SMTP client (RFC 5321).
//!
//! ## Features
//!
//! - **One method per verb**: HELO, EHLO, MAIL, RCPT, DATA, RSET, NOOP, QUIT,
//!   STARTTLS, AUTH PLAIN and AUTH LOGIN
//! - **Multi-line replies** with optional enhanced status codes (RFC 2034)
//! - **Capability tracking**: SIZE, AUTH, STARTTLS, SMTPUTF8 gate the
//!   operations that need them
//! - **Pluggable transport** through the [`LineChannel`] trait, with a bundled
//!   TCP/TLS implementation
//!
//! ## Quick Start
//!
//! ```ignore
//! use postwire_smtp::{ChannelConfig, Client, TcpChannel};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> postwire_smtp::Result<()> {
//!     let channel = TcpChannel::new(ChannelConfig::new("smtp.example.com"));
//!     let mut client = Client::new(channel);
//!     let timeout = Some(Duration::from_secs(30));
//!
//!     client.connect(timeout).await?;
//!     client.greet(Some("client.example.com"), timeout).await?;
//!
//!     if client.has_extension("STARTTLS") {
//!         client.secure(timeout).await?;
//!         client.greet(Some("client.example.com"), timeout).await?;
//!     }
//!
//!     client.auth_plain("user@example.com", "password", timeout).await?;
//!     client.mail("sender@example.com", false, timeout).await?;
//!     client.rcpt("recipient@example.com", timeout).await?;
//!     client.data("Subject: Test\r\n\r\nHello, World!", None, timeout).await?;
//!     client.quit(timeout).await?;
//!     client.close().await
//! }
//! ```
//!
//! ## Errors
//!
//! A reply outside the expected class surfaces as [`Error::Reply`] carrying
//! the joined reply text, the code and the enhanced code. Operations whose
//! capability is missing, or whose message is larger than the advertised
//! `SIZE`, fail with a local error before anything is sent
//! ([`Error::is_local`]).
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Client, line channel trait and TCP channel
//! - [`parser`]: Reply parser
//! - [`types`]: Core SMTP types (capabilities, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    ChannelConfig, ChannelConfigBuilder, Client, LineChannel, Security, SmtpStream, TcpChannel,
};
pub use error::{Error, ReplyError, Result};
pub use parser::ReplyBuffer;
pub use types::{AuthMechanism, Capabilities, Capability, EnhancedCode, Reply, ReplyCode};
