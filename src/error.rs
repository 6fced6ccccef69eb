//! Error types for the codewatch crate.
//!
//! All errors implement [`std::error::Error`] and provide context about what went wrong.
//! Errors are categorized by their retryability - see [`Error::is_retryable`].

use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while polling mailboxes and extracting codes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration / validation errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// Invalid mailbox address format.
    #[error("invalid mailbox address: {address}")]
    InvalidMailboxAddress {
        /// The invalid mailbox address.
        address: String,
    },

    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid DNS name for TLS.
    #[error("invalid DNS name for host '{host}'")]
    InvalidDnsName {
        /// The invalid hostname.
        host: String,
        /// The underlying DNS name error.
        #[source]
        source: rustls::client::InvalidDnsNameError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Network / connection errors (RETRYABLE)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to establish TCP connection.
    #[error("failed to connect to {target}")]
    TcpConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to establish TLS connection.
    #[error("failed to establish TLS connection to {target}")]
    TlsConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Timeout errors (mixed retryability)
    // ─────────────────────────────────────────────────────────────────────────
    /// Connection timeout.
    #[error("connection timeout to {target} after {timeout:?}")]
    ConnectTimeout {
        /// The target address.
        target: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Authentication timeout.
    #[error("authentication timeout for {address} after {timeout:?}")]
    AuthTimeout {
        /// The mailbox address used for authentication.
        address: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Mailbox open (EXAMINE) timeout.
    #[error("mailbox open timeout for '{mailbox}' after {timeout:?}")]
    SelectTimeout {
        /// The mailbox name.
        mailbox: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Message fetch timeout.
    #[error("message fetch timeout for sequence range {range} after {timeout:?}")]
    FetchTimeout {
        /// The sequence range being fetched.
        range: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The whole check for one mailbox exceeded its deadline.
    ///
    /// Treated like a connection failure for that mailbox only; the rest of
    /// a batch poll continues.
    #[error("mailbox check for {address} exceeded deadline of {timeout:?}")]
    MailboxDeadline {
        /// The mailbox address being checked.
        address: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// Logout timeout (not critical).
    #[error("logout timeout after {timeout:?}")]
    LogoutTimeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // IMAP protocol errors (RETRYABLE - could be transient server issues)
    // ─────────────────────────────────────────────────────────────────────────
    /// IMAP login failed.
    #[error("IMAP login failed for {address}")]
    ImapLogin {
        /// The mailbox address used for login.
        address: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to open mailbox read-only.
    #[error("failed to open mailbox '{mailbox}'")]
    OpenMailbox {
        /// The mailbox name.
        mailbox: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP fetch failed.
    #[error("IMAP fetch failed for sequence range {range}")]
    ImapFetch {
        /// The sequence range that failed.
        range: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to retrieve a message from the fetch stream.
    #[error("failed to retrieve message from fetch stream")]
    FetchMessage {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP logout failed.
    #[error("IMAP logout failed")]
    ImapLogout {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Email parsing errors (NOT retryable - malformed content won't change)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to parse email message.
    #[error("failed to parse email")]
    ParseMail {
        /// The underlying parse error.
        #[source]
        source: mailparse::MailParseError,
    },

    /// Failed to extract email body.
    #[error("failed to extract email body")]
    ExtractBody {
        /// The underlying parse error.
        #[source]
        source: mailparse::MailParseError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup / storage errors
    // ─────────────────────────────────────────────────────────────────────────
    /// No mailbox with the given id exists.
    #[error("mailbox with id {id} not found")]
    MailboxNotFound {
        /// The unknown mailbox id.
        id: u64,
    },

    /// The persistence layer reported a failure.
    #[error("store operation failed: {message}")]
    Store {
        /// Description of the storage failure.
        message: String,
    },
}

impl Error {
    /// Returns `true` if this error represents a transient failure that might succeed on retry.
    ///
    /// Use this to implement retry logic:
    ///
    /// ```ignore
    /// if error.is_retryable() {
    ///     // Backoff and retry
    /// } else {
    ///     // Fail permanently
    /// }
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            // RETRYABLE errors: network, connection timeouts, IMAP operations, storage
            Error::TcpConnect { .. }
            | Error::TlsConnect { .. }
            | Error::ConnectTimeout { .. }
            | Error::AuthTimeout { .. }
            | Error::SelectTimeout { .. }
            | Error::FetchTimeout { .. }
            | Error::MailboxDeadline { .. }
            | Error::ImapLogin { .. }
            | Error::OpenMailbox { .. }
            | Error::ImapFetch { .. }
            | Error::FetchMessage { .. }
            | Error::Store { .. } => true,

            // NOT retryable: config errors, logout, parsing, unknown mailbox
            Error::InvalidMailboxAddress { .. }
            | Error::InvalidConfig { .. }
            | Error::InvalidDnsName { .. }
            | Error::LogoutTimeout { .. }
            | Error::ImapLogout { .. }
            | Error::ParseMail { .. }
            | Error::ExtractBody { .. }
            | Error::MailboxNotFound { .. } => false,
        }
    }

    /// Returns the error category for metrics/logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidMailboxAddress { .. }
            | Error::InvalidConfig { .. }
            | Error::InvalidDnsName { .. } => ErrorCategory::Configuration,

            Error::TcpConnect { .. }
            | Error::TlsConnect { .. }
            | Error::ConnectTimeout { .. }
            | Error::AuthTimeout { .. }
            | Error::SelectTimeout { .. }
            | Error::MailboxDeadline { .. }
            | Error::LogoutTimeout { .. }
            | Error::ImapLogin { .. }
            | Error::OpenMailbox { .. }
            | Error::ImapLogout { .. } => ErrorCategory::Connection,

            Error::FetchTimeout { .. } | Error::ImapFetch { .. } | Error::FetchMessage { .. } => {
                ErrorCategory::Fetch
            }

            Error::ParseMail { .. } | Error::ExtractBody { .. } => ErrorCategory::Parse,

            Error::MailboxNotFound { .. } => ErrorCategory::NotFound,

            Error::Store { .. } => ErrorCategory::Storage,
        }
    }
}

/// Error categories for metrics and logging.
///
/// `Connection` covers everything up to and including opening the mailbox;
/// `Fetch` covers failures enumerating or retrieving the message range after
/// a successful connection. Both are per-mailbox and never abort a batch poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration or validation errors.
    Configuration,
    /// Connect/auth/TLS/timeout failures for one mailbox.
    Connection,
    /// Failures retrieving the message range after a successful connection.
    Fetch,
    /// Email parsing errors (isolated to a single message).
    Parse,
    /// Unknown mailbox id.
    NotFound,
    /// Persistence layer failures.
    Storage,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Connection => write!(f, "connection"),
            ErrorCategory::Fetch => write!(f, "fetch"),
            ErrorCategory::Parse => write!(f, "parse"),
            ErrorCategory::NotFound => write!(f, "not_found"),
            ErrorCategory::Storage => write!(f, "storage"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        // Configuration errors are not retryable
        let err = Error::InvalidMailboxAddress {
            address: "bad".into(),
        };
        assert!(!err.is_retryable());

        // Network errors are retryable
        let err = Error::TcpConnect {
            target: "imap.example.com:993".into(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(err.is_retryable());

        // A whole-mailbox deadline is retryable on the next cycle
        let err = Error::MailboxDeadline {
            address: "user@example.com".into(),
            timeout: Duration::from_secs(60),
        };
        assert!(err.is_retryable());

        // Unknown mailbox id is not retryable
        let err = Error::MailboxNotFound { id: 42 };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_categories() {
        let err = Error::InvalidMailboxAddress {
            address: "bad".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);

        let err = Error::ConnectTimeout {
            target: "imap.example.com:993".into(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.category(), ErrorCategory::Connection);

        let err = Error::FetchTimeout {
            range: "6:*".into(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.category(), ErrorCategory::Fetch);

        let err = Error::MailboxNotFound { id: 7 };
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }
}
