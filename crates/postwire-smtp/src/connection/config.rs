//! Channel configuration types.

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Start with plaintext (port 25). Upgrade later with STARTTLS.
    #[default]
    Plain,
    /// TLS from the start (port 465).
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Plain => 25,
            Self::Implicit => 465,
        }
    }
}

/// TCP channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Name checked against the server certificate. Defaults to `host`.
    pub tls_server_name: Option<String>,
}

impl ChannelConfig {
    /// Creates a plaintext configuration on port 25.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Security::Plain.default_port(),
            security: Security::Plain,
            tls_server_name: None,
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ChannelConfigBuilder {
        ChannelConfigBuilder::new(host)
    }

    /// Returns the name used for certificate verification.
    #[must_use]
    pub fn server_name(&self) -> &str {
        self.tls_server_name.as_deref().unwrap_or(&self.host)
    }
}

/// Builder for channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    tls_server_name: Option<String>,
}

impl ChannelConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::Plain,
            tls_server_name: None,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Overrides the name checked against the server certificate.
    #[must_use]
    pub fn tls_server_name(mut self, name: impl Into<String>) -> Self {
        self.tls_server_name = Some(name.into());
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ChannelConfig {
        ChannelConfig {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            tls_server_name: self.tls_server_name,
        }
    }
}
