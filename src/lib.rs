//! # codewatch
//!
//! Async IMAP mailbox poller that extracts streaming-service verification
//! codes from incoming mail.
//!
//! The crate polls configured mailboxes over IMAP, inspects the most recent
//! messages, and extracts one-time login/verification codes using
//! per-platform rules (allowed senders, keyword gates, prioritized patterns)
//! backed by a shared validation gate that filters out years, round numbers,
//! and words that loose patterns mis-capture.
//!
//! ## Features
//!
//! - **`observability`**: Enables OpenTelemetry integration for distributed
//!   tracing. Without this feature, tracing spans are still emitted but
//!   require no OTEL dependencies.
//!
//! ## Quick Start
//!
//! ```no_run
//! use codewatch::{ImapFetcher, MailboxConfig, Poller};
//! use codewatch::rules::RuleBook;
//! use codewatch::store::{MailboxStore, MemoryStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> codewatch::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! store.add_mailbox(
//!     MailboxConfig::builder()
//!         .id(1)
//!         .address("codes@example.com")
//!         .secret("imap-password")
//!         .host("mail.example.com")
//!         .platform("netflix")
//!         .build()?,
//! );
//!
//! let fetcher = Arc::new(ImapFetcher::new(RuleBook::with_defaults()));
//! let poller = Poller::new(store, fetcher);
//!
//! // Invoked by a fixed-interval scheduler
//! for result in poller.poll_all().await? {
//!     println!("{}: {:?}", result.address, result.code);
//! }
//!
//! // Or on demand for one mailbox
//! let result = poller.poll_one(1).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Adding a platform
//!
//! Platforms are data, not code:
//!
//! ```
//! use codewatch::rules::{PlatformRule, RuleBook};
//!
//! let mut rules = RuleBook::with_defaults();
//! rules.register(
//!     "prime",
//!     PlatformRule::numeric(&["account-update@primevideo.com"], &[r"\b(\d{6})\b"], &[6]),
//! );
//! ```
//!
//! ## Error Handling
//!
//! All errors implement `std::error::Error` and provide context. Errors
//! local to one mailbox or one message never abort a batch poll; use
//! [`Error::is_retryable`] to drive retry logic on manual checks.
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. Major operations emit
//! spans with structured fields:
//!
//! - `Poller::poll_all` / `Poller::poll_one` - poll cycles
//! - `ImapFetcher::fetch_latest` - one mailbox fetch
//! - `session::authenticate` - IMAP authentication
//! - `connection::establish_tls` - TLS connection
//!
//! Standard fields include `mailbox_id`, `address`, `imap_host`, and
//! `platform`. Credentials are never logged.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod filter;
pub mod notify;
pub mod poller;
pub mod rules;
pub mod store;
pub mod validate;

// Internal modules
mod connection;
mod parser;
mod session;

// Re-exports for ergonomic API
pub use config::{MailboxConfig, MailboxConfigBuilder, PollerConfig, TimeoutConfig};
pub use email_address::EmailAddress;
pub use error::{Error, ErrorCategory, Result};
pub use fetcher::{ExtractedMessage, FetchMail, ImapFetcher};
pub use notify::{ChangeEvent, NotificationSink, SinkRegistry};
pub use poller::{PollResult, Poller};
pub use rules::{PlatformRule, RuleBook};
pub use store::{MailboxStore, MemoryStore, StoredMessage};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        // Ensure all public types are accessible
        let _ = MailboxConfig::builder();
        let _ = RuleBook::with_defaults();
        let _ = SinkRegistry::new();
        assert!(validate::is_valid_code("482913", None));
    }
}
