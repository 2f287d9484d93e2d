//! SMTP command builder.

use std::net::Ipv4Addr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::types::AuthMechanism;

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Simple greeting
    Helo {
        /// Client hostname
        hostname: String,
    },
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Begin authentication
    Auth {
        /// Authentication mechanism
        mechanism: AuthMechanism,
        /// Initial response (optional, for SASL-IR)
        initial_response: Option<String>,
    },
    /// Bare base64 line answering an AUTH challenge
    AuthResponse(String),
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: String,
        /// Request the SMTPUTF8 extension (RFC 6531)
        smtp_utf8: bool,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: String,
    },
    /// DATA - Begin message data
    Data,
    /// RSET - Reset transaction
    Rset,
    /// NOOP - No operation
    Noop,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Serializes the command to its CRLF-terminated wire form.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut buf = match self {
            Self::Helo { hostname } => format!("HELO {hostname}"),
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::Auth {
                mechanism,
                initial_response,
            } => match initial_response {
                Some(resp) => format!("AUTH {} {resp}", mechanism.as_str()),
                None => format!("AUTH {}", mechanism.as_str()),
            },
            Self::AuthResponse(token) => token.clone(),
            Self::MailFrom { from, smtp_utf8 } => {
                if *smtp_utf8 {
                    format!("MAIL FROM:<{from}> SMTPUTF8")
                } else {
                    format!("MAIL FROM:<{from}>")
                }
            }
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Rset => "RSET".to_string(),
            Self::Noop => "NOOP".to_string(),
            Self::Quit => "QUIT".to_string(),
        };

        buf.push_str("\r\n");
        buf
    }

    /// Returns the command verb, safe to log.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Helo { .. } => "HELO",
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::Auth { .. } => "AUTH",
            Self::AuthResponse(_) => "AUTH-RESPONSE",
            Self::MailFrom { .. } => "MAIL",
            Self::RcptTo { .. } => "RCPT",
            Self::Data => "DATA",
            Self::Rset => "RSET",
            Self::Noop => "NOOP",
            Self::Quit => "QUIT",
        }
    }
}

/// Builds the AUTH PLAIN initial response (RFC 4616): `base64(\0user\0pass)`.
#[must_use]
pub fn plain_credentials(username: &str, password: &str) -> String {
    STANDARD.encode(format!("\0{username}\0{password}"))
}

/// Base64-encodes one AUTH LOGIN answer.
#[must_use]
pub fn login_token(value: &str) -> String {
    STANDARD.encode(value)
}

/// Prepares a message body for transmission after `DATA`.
///
/// Every line starting with `.` gets a second dot, line endings become CRLF,
/// and the terminating `.` line is appended.
#[must_use]
pub fn dot_stuff(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 8);
    for (i, line) in source.split('\n').enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
    }
    out.push_str("\r\n.\r\n");
    out
}

/// Returns the identity this client announces in HELO/EHLO.
///
/// RFC 5321 wants a fully-qualified domain name or an address literal, so a
/// bare host name falls back to `[127.0.0.1]`.
#[must_use]
pub fn client_hostname() -> String {
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    normalize_hostname(&host)
}

fn normalize_hostname(host: &str) -> String {
    if host.parse::<Ipv4Addr>().is_ok() {
        format!("[{host}]")
    } else if !host.contains('.') {
        "[127.0.0.1]".to_string()
    } else {
        host.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helo_command() {
        let cmd = Command::Helo {
            hostname: "client.example.com".to_string(),
        };
        assert_eq!(cmd.serialize(), "HELO client.example.com\r\n");
    }

    #[test]
    fn test_ehlo_command() {
        let cmd = Command::Ehlo {
            hostname: "foo".to_string(),
        };
        assert_eq!(cmd.serialize(), "EHLO foo\r\n");
    }

    #[test]
    fn test_starttls_command() {
        assert_eq!(Command::StartTls.serialize(), "STARTTLS\r\n");
    }

    #[test]
    fn test_auth_plain() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(plain_credentials("user", "pass")),
        };
        assert_eq!(cmd.serialize(), "AUTH PLAIN AHVzZXIAcGFzcw==\r\n");
    }

    #[test]
    fn test_auth_login() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        assert_eq!(cmd.serialize(), "AUTH LOGIN\r\n");
        assert_eq!(
            Command::AuthResponse(login_token("foo")).serialize(),
            "Zm9v\r\n"
        );
        assert_eq!(login_token("bar"), "YmFy");
    }

    #[test]
    fn test_mail_from() {
        let cmd = Command::MailFrom {
            from: "sender@example.com".to_string(),
            smtp_utf8: false,
        };
        assert_eq!(cmd.serialize(), "MAIL FROM:<sender@example.com>\r\n");

        let cmd = Command::MailFrom {
            from: "sender@example.com".to_string(),
            smtp_utf8: true,
        };
        assert_eq!(
            cmd.serialize(),
            "MAIL FROM:<sender@example.com> SMTPUTF8\r\n"
        );
    }

    #[test]
    fn test_rcpt_to_command() {
        let cmd = Command::RcptTo {
            to: "recipient@example.com".to_string(),
        };
        assert_eq!(cmd.serialize(), "RCPT TO:<recipient@example.com>\r\n");
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(Command::Data.serialize(), "DATA\r\n");
        assert_eq!(Command::Rset.serialize(), "RSET\r\n");
        assert_eq!(Command::Noop.serialize(), "NOOP\r\n");
        assert_eq!(Command::Quit.serialize(), "QUIT\r\n");
    }

    #[test]
    fn test_verb_hides_credentials() {
        let cmd = Command::AuthResponse(login_token("secret"));
        assert_eq!(cmd.verb(), "AUTH-RESPONSE");
    }

    #[test]
    fn test_dot_stuff() {
        assert_eq!(dot_stuff("bar"), "bar\r\n.\r\n");
        assert_eq!(dot_stuff(".bar"), "..bar\r\n.\r\n");
        assert_eq!(dot_stuff("a\n.b\r\n.c"), "a\r\n..b\r\n..c\r\n.\r\n");
        assert_eq!(dot_stuff("a.\r\nb"), "a.\r\nb\r\n.\r\n");
    }

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(normalize_hostname("mx.example.com"), "mx.example.com");
        assert_eq!(normalize_hostname("localhost"), "[127.0.0.1]");
        assert_eq!(normalize_hostname("192.168.1.1"), "[192.168.1.1]");
        assert_eq!(normalize_hostname(""), "[127.0.0.1]");
    }

    #[test]
    fn test_client_hostname_is_usable() {
        let host = client_hostname();
        assert!(!host.is_empty());
        assert!(!host.contains(' '));
    }
}
