//! Server capabilities advertised in the EHLO reply.

use std::slice;

/// A single capability line, e.g. `SIZE 35882577` or `AUTH LOGIN PLAIN`.
///
/// The line is split into its keyword and arguments once, when the EHLO
/// reply is ingested. The keyword keeps the case the server advertised.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Capability {
    raw: String,
    name: String,
    args: Vec<String>,
}

impl Capability {
    /// Parses a capability line from the EHLO response.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let (name, rest) = line.split_once(' ').unwrap_or((line, ""));
        Self {
            raw: line.to_string(),
            name: name.to_string(),
            args: rest.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Returns the keyword (first space-delimited token).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the arguments following the keyword, in order.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the line exactly as it was advertised.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Ordered capability set owned by the client.
///
/// Order and duplicates are preserved. Lookups use the first matching entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(Vec<Capability>);

impl Capabilities {
    /// Creates an empty capability set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Builds a capability set from the decoded EHLO lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            lines
                .into_iter()
                .map(|line| Capability::parse(line.as_ref()))
                .collect(),
        )
    }

    /// Removes every capability.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Returns true if nothing has been advertised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of recorded capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the capabilities in advertised order.
    pub fn iter(&self) -> slice::Iter<'_, Capability> {
        self.0.iter()
    }

    /// Returns the first capability whose keyword equals `name` exactly.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.0.iter().find(|cap| cap.name == name)
    }

    /// Checks if the server advertised `name` (case-sensitive).
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the `SIZE` limit in bytes, or `0` when none was advertised.
    ///
    /// Leading digits of the argument are used; a missing or non-numeric
    /// argument yields `0`. Values beyond `usize::MAX` saturate.
    #[must_use]
    pub fn size_limit(&self) -> usize {
        self.get("SIZE")
            .and_then(|cap| cap.args.first())
            .map_or(0, |arg| {
                arg.bytes()
                    .take_while(u8::is_ascii_digit)
                    .fold(0usize, |limit, digit| {
                        limit
                            .saturating_mul(10)
                            .saturating_add(usize::from(digit - b'0'))
                    })
            })
    }

    /// Returns the advertised AUTH mechanisms, upper-cased, in order.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<String> {
        self.get("AUTH")
            .map(|cap| cap.args.iter().map(|m| m.to_uppercase()).collect())
            .unwrap_or_default()
    }

    /// Checks if `mechanism` appears in the AUTH capability.
    #[must_use]
    pub fn supports_auth(&self, mechanism: AuthMechanism) -> bool {
        self.auth_mechanisms()
            .iter()
            .any(|m| m == mechanism.as_str())
    }
}

impl<'a> IntoIterator for &'a Capabilities {
    type Item = &'a Capability;
    type IntoIter = slice::Iter<'a, Capability>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// SASL mechanism the client can authenticate with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN (RFC 4616)
    Plain,
    /// LOGIN - legacy plaintext
    Login,
}

impl AuthMechanism {
    /// Returns the mechanism name as advertised in the AUTH capability.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }
}
