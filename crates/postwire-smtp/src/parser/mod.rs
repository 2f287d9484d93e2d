//! SMTP reply parser.
//!
//! Replies arrive as one or more `DDD[- ]text` lines:
//! - Single: `250 OK\r\n`
//! - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
//!
//! When the server advertised `ENHANCEDSTATUSCODES` (RFC 2034), the text of
//! each line is additionally prefixed with a `class.subject.detail` token.

use crate::error::{Error, ReplyError, Result};
use crate::types::{EnhancedCode, Reply, ReplyCode, collapse_whitespace};

/// Accumulates the raw lines of the reply to one in-flight command.
///
/// A channel pushes lines in arrival order; the buffer is scoped to a single
/// exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyBuffer {
    lines: Vec<String>,
}

impl ReplyBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Appends a received line.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Returns the lines received so far.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns the first received line.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }

    /// Returns true once the last received line is a final line.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.lines.last().is_some_and(|line| is_final_line(line))
    }

    /// Returns true if nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Checks if a line is the last line of a reply.
///
/// Continuation lines carry `-` after the code, the final line a space.
#[must_use]
pub fn is_final_line(line: &str) -> bool {
    line.len() >= 4 && line.as_bytes()[3] == b' '
}

/// Parses the three-digit status code at the start of a line.
///
/// # Errors
///
/// Returns [`Error::Malformed`] if the line does not start with three digits.
pub fn status_code(line: &str) -> Result<ReplyCode> {
    let code = line
        .get(..3)
        .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| Error::Malformed(format!("Invalid reply code: {line}")))?;
    code.parse::<u16>()
        .map(ReplyCode::new)
        .map_err(|_| Error::Malformed(format!("Invalid reply code: {line}")))
}

/// Returns the text part of a reply line.
///
/// Strips the four-character `DDD-`/`DDD ` prefix, and when enhanced codes
/// are in use also the enhanced code token and the whitespace after it.
#[must_use]
pub fn reply_text(line: &str, enhanced: bool) -> &str {
    let text = line.get(4..).unwrap_or_default();
    if !enhanced {
        return text;
    }
    text.split_once(char::is_whitespace)
        .map_or("", |(_, rest)| rest.trim_start())
}

/// Returns the enhanced status code token of a reply line, if enhanced codes
/// are in use.
#[must_use]
pub fn enhanced_code(line: &str, enhanced: bool) -> Option<&str> {
    if !enhanced {
        return None;
    }
    let text = line.get(4..).unwrap_or_default();
    text.split(' ').next()
}

/// Joins the text of every line with a single space and collapses whitespace.
#[must_use]
pub fn joined_message(lines: &[String], enhanced: bool) -> String {
    let texts: Vec<&str> = lines.iter().map(|l| reply_text(l, enhanced)).collect();
    collapse_whitespace(&texts.join(" "))
}

/// Parses an SMTP reply from its raw lines.
///
/// # Errors
///
/// Returns an error if the reply is empty, a line is malformed, or the lines
/// do not share one status code.
pub fn parse_reply(lines: &[String], enhanced: bool) -> Result<Reply> {
    let last = lines
        .last()
        .ok_or_else(|| Error::Malformed("Empty reply".into()))?;
    let code = status_code(last)?;

    for line in lines {
        if status_code(line)? != code {
            return Err(Error::Malformed(format!(
                "Reply line {line:?} does not match code {code}"
            )));
        }
    }

    let message = lines
        .iter()
        .map(|l| reply_text(l, enhanced).to_string())
        .collect();
    let enhanced_code = enhanced_code(last, enhanced).and_then(EnhancedCode::parse);

    Ok(Reply::new(code, message).with_enhanced_code(enhanced_code))
}

/// Builds the error for a refused reply.
///
/// Unlike [`parse_reply`] this never fails: a malformed final line falls back
/// to `fallback` for the code.
#[must_use]
pub fn reply_error(lines: &[String], enhanced: bool, fallback: ReplyCode) -> ReplyError {
    let last = lines.last().map(String::as_str).unwrap_or_default();
    let code = status_code(last).unwrap_or(fallback);
    let enhanced_code = enhanced_code(last, enhanced).and_then(EnhancedCode::parse);
    ReplyError::new(code, joined_message(lines, enhanced), enhanced_code)
}
