//! Mailbox and poller configuration.
//!
//! Use [`MailboxConfigBuilder`] to describe one monitored mailbox:
//!
//! ```
//! use codewatch::MailboxConfig;
//!
//! let mailbox = MailboxConfig::builder()
//!     .id(1)
//!     .address("codes@example.com")
//!     .secret("imap-password")
//!     .host("mail.example.com")
//!     .platform("netflix")
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use email_address::EmailAddress;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Configuration for one monitored mailbox.
///
/// Create using [`MailboxConfig::builder()`]. Owned by the persistence layer;
/// read-only to the core during a poll cycle.
///
/// Note: the IMAP credential is stored as a [`SecretString`] to prevent
/// accidental logging, and the address is a validated [`EmailAddress`].
#[derive(Clone)]
pub struct MailboxConfig {
    /// Unique mailbox id.
    pub id: u64,
    /// Mailbox address (also the IMAP login name).
    address: EmailAddress,
    /// IMAP credential (protected from accidental logging).
    secret: SecretString,
    /// IMAP server hostname.
    pub host: String,
    /// IMAP server port (default: 993, implies TLS).
    pub port: u16,
    /// Platform label, a case-insensitive key into the rule book.
    pub platform: Option<String>,
    /// Display logo reference for the client UI.
    pub logo: Option<String>,
    /// Inactive mailboxes are excluded from bulk polling but remain
    /// reachable through on-demand single-mailbox checks.
    pub active: bool,
    /// When this mailbox was last checked.
    pub last_checked: Option<DateTime<Utc>>,
    /// Accept certificates that do not match the hostname (default: true).
    /// The channel stays encrypted either way.
    pub tls_relaxed: bool,
}

impl std::fmt::Debug for MailboxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxConfig")
            .field("id", &self.id)
            .field("address", &self.address.as_str())
            .field("secret", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("platform", &self.platform)
            .field("active", &self.active)
            .field("last_checked", &self.last_checked)
            .field("tls_relaxed", &self.tls_relaxed)
            .finish()
    }
}

impl MailboxConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> MailboxConfigBuilder {
        MailboxConfigBuilder::default()
    }

    /// Returns the mailbox address as a string slice.
    #[must_use]
    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    /// Returns the IMAP credential as a string slice.
    ///
    /// The secret is intentionally not directly accessible to prevent
    /// accidental logging.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }

    /// Returns the platform label, if any.
    #[must_use]
    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    /// Returns the full IMAP server address as "host:port".
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for [`MailboxConfig`].
#[derive(Debug, Default)]
pub struct MailboxConfigBuilder {
    id: Option<u64>,
    address: Option<String>,
    secret: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    platform: Option<String>,
    logo: Option<String>,
    active: Option<bool>,
    last_checked: Option<DateTime<Utc>>,
    tls_relaxed: Option<bool>,
}

impl MailboxConfigBuilder {
    /// Sets the unique mailbox id (required).
    #[must_use]
    pub fn id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the mailbox address (required).
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the IMAP credential (required).
    #[must_use]
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Sets the IMAP server hostname (required).
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the IMAP server port. Default is 993 (IMAPS with TLS).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the platform label used to resolve extraction rules.
    #[must_use]
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Sets the display logo reference.
    #[must_use]
    pub fn logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = Some(logo.into());
        self
    }

    /// Sets the active flag. Default is true.
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Sets the last-checked timestamp.
    #[must_use]
    pub fn last_checked(mut self, at: DateTime<Utc>) -> Self {
        self.last_checked = Some(at);
        self
    }

    /// Enables or disables relaxed certificate validation. Default is true.
    #[must_use]
    pub fn tls_relaxed(mut self, relaxed: bool) -> Self {
        self.tls_relaxed = Some(relaxed);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or the address is not
    /// a valid email address.
    pub fn build(self) -> Result<MailboxConfig> {
        let address_raw = self.address.ok_or_else(|| Error::InvalidConfig {
            message: "address is required".into(),
        })?;

        let address = EmailAddress::parse_with_options(&address_raw, email_address::Options::default())
            .map_err(|_| Error::InvalidMailboxAddress {
                address: address_raw.clone(),
            })?;

        let secret_raw = self.secret.ok_or_else(|| Error::InvalidConfig {
            message: "secret is required".into(),
        })?;

        let host = self.host.ok_or_else(|| Error::InvalidConfig {
            message: "host is required".into(),
        })?;

        Ok(MailboxConfig {
            id: self.id.unwrap_or(0),
            address,
            secret: SecretString::from(secret_raw),
            host,
            port: self.port.unwrap_or(993),
            platform: self.platform,
            logo: self.logo,
            active: self.active.unwrap_or(true),
            last_checked: self.last_checked,
            tls_relaxed: self.tls_relaxed.unwrap_or(true),
        })
    }
}

/// Timeout configuration for the IMAP operations of one fetch.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for establishing TCP/TLS connection.
    pub connect: Duration,
    /// Timeout for IMAP authentication.
    pub auth: Duration,
    /// Timeout for opening the mailbox.
    pub select: Duration,
    /// Timeout for fetching message content.
    pub fetch: Duration,
    /// Timeout for logout operation.
    pub logout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            auth: Duration::from_secs(30),
            select: Duration::from_secs(10),
            fetch: Duration::from_secs(30),
            logout: Duration::from_secs(5),
        }
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Overall deadline for one mailbox's check (connect + fetch). On
    /// timeout that mailbox alone fails; the batch continues.
    pub mailbox_deadline: Duration,
    /// Global cap on stored message rows; the retention sweep deletes the
    /// oldest rows beyond it.
    pub retention_cap: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            mailbox_deadline: Duration::from_secs(90),
            retention_cap: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_minimal() {
        let config = MailboxConfig::builder()
            .id(7)
            .address("user@example.com")
            .secret("secret")
            .host("mail.example.com")
            .build()
            .unwrap();

        assert_eq!(config.id, 7);
        assert_eq!(config.address(), "user@example.com");
        assert_eq!(config.secret(), "secret");
        assert_eq!(config.port, 993);
        assert!(config.active);
        assert!(config.tls_relaxed);
        assert!(config.platform.is_none());
    }

    #[test]
    fn test_builder_full() {
        let config = MailboxConfig::builder()
            .id(1)
            .address("user@example.com")
            .secret("secret")
            .host("mail.example.com")
            .port(994)
            .platform("netflix")
            .logo("netflix.png")
            .active(false)
            .tls_relaxed(false)
            .build()
            .unwrap();

        assert_eq!(config.port, 994);
        assert_eq!(config.platform(), Some("netflix"));
        assert_eq!(config.logo.as_deref(), Some("netflix.png"));
        assert!(!config.active);
        assert!(!config.tls_relaxed);
    }

    #[test]
    fn test_builder_missing_fields() {
        assert!(MailboxConfig::builder()
            .secret("x")
            .host("h.example.com")
            .build()
            .is_err());
        assert!(MailboxConfig::builder()
            .address("a@example.com")
            .host("h.example.com")
            .build()
            .is_err());
        assert!(MailboxConfig::builder()
            .address("a@example.com")
            .secret("x")
            .build()
            .is_err());
    }

    #[test]
    fn test_builder_invalid_address() {
        let result = MailboxConfig::builder()
            .address("not-an-email")
            .secret("x")
            .host("h.example.com")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_server_address() {
        let config = MailboxConfig::builder()
            .address("user@example.com")
            .secret("x")
            .host("mail.example.com")
            .build()
            .unwrap();

        assert_eq!(config.server_address(), "mail.example.com:993");
    }

    #[test]
    fn test_secret_not_in_debug() {
        let config = MailboxConfig::builder()
            .address("user@example.com")
            .secret("super-secret-password")
            .host("mail.example.com")
            .build()
            .unwrap();

        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("super-secret-password"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_poller_config_defaults() {
        let config = PollerConfig::default();
        assert_eq!(config.retention_cap, 100);
        assert!(config.mailbox_deadline > Duration::ZERO);
    }
}
