//! Mail fetching: one bounded pass over a mailbox's most recent messages.
//!
//! [`ImapFetcher`] opens a TLS IMAP session, examines the inbox read-only,
//! fetches the trailing window of most-recent messages, and runs each through
//! the sender filter and code extraction, tracking the single most-recent
//! eligible message. The [`FetchMail`] trait is the seam that lets the
//! orchestrator be tested without a live server.

use crate::config::{MailboxConfig, TimeoutConfig};
use crate::connection;
use crate::error::{Error, Result};
use crate::extract::extract_code;
use crate::filter::sender_is_allowed;
use crate::parser::{self, ParsedEmail};
use crate::rules::RuleBook;
use crate::session::{self, ImapSession};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// How many trailing messages one fetch inspects.
const FETCH_WINDOW: u32 = 5;

/// Maximum stored body length in characters.
const MAX_BODY_CHARS: usize = 5000;

/// Transient result of parsing one mail item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMessage {
    /// Message subject.
    pub subject: String,
    /// Sender display string.
    pub sender: String,
    /// Recipient, when present.
    pub recipient: Option<String>,
    /// Message body, truncated to a fixed maximum.
    pub body: String,
    /// Extracted verification code, if any candidate validated.
    pub code: Option<String>,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
}

/// Fetches the latest relevant message for a mailbox.
///
/// Implemented by [`ImapFetcher`] for real IMAP servers; test code supplies
/// scripted implementations.
#[async_trait]
pub trait FetchMail: Send + Sync {
    /// Returns the most recent eligible message, or `None` for an empty
    /// mailbox or a window with no eligible messages.
    async fn fetch_latest(&self, mailbox: &MailboxConfig) -> Result<Option<ExtractedMessage>>;
}

/// IMAP-backed [`FetchMail`] implementation.
///
/// # Example
///
/// ```no_run
/// use codewatch::{ImapFetcher, MailboxConfig};
/// use codewatch::fetcher::FetchMail;
/// use codewatch::rules::RuleBook;
///
/// # async fn example() -> codewatch::Result<()> {
/// let fetcher = ImapFetcher::new(RuleBook::with_defaults());
/// let mailbox = MailboxConfig::builder()
///     .id(1)
///     .address("codes@example.com")
///     .secret("imap-password")
///     .host("mail.example.com")
///     .platform("netflix")
///     .build()?;
///
/// if let Some(message) = fetcher.fetch_latest(&mailbox).await? {
///     println!("latest code: {:?}", message.code);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ImapFetcher {
    rules: Arc<RuleBook>,
    timeouts: TimeoutConfig,
}

impl ImapFetcher {
    /// Creates a fetcher with default timeouts.
    #[must_use]
    pub fn new(rules: RuleBook) -> Self {
        Self {
            rules: Arc::new(rules),
            timeouts: TimeoutConfig::default(),
        }
    }

    /// Overrides the per-operation timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Opens the session: TLS connect, authenticate, all timeout-wrapped.
    async fn open_session(&self, mailbox: &MailboxConfig) -> Result<ImapSession> {
        let target_addr = mailbox.server_address();

        let tls_stream = tokio::time::timeout(
            self.timeouts.connect,
            connection::establish_tls_connection(&mailbox.host, &target_addr, mailbox.tls_relaxed),
        )
        .await
        .map_err(|_| Error::ConnectTimeout {
            target: target_addr.clone(),
            timeout: self.timeouts.connect,
        })??;

        debug!("TLS connection established");

        let session = tokio::time::timeout(
            self.timeouts.auth,
            session::authenticate(tls_stream, mailbox.address(), mailbox.secret()),
        )
        .await
        .map_err(|_| Error::AuthTimeout {
            address: mailbox.address().to_string(),
            timeout: self.timeouts.auth,
        })??;

        debug!("Authenticated");

        Ok(session)
    }

    /// Scans the trailing message window for the latest eligible message.
    async fn scan_inbox(
        &self,
        session: &mut ImapSession,
        mailbox: &MailboxConfig,
    ) -> Result<Option<ExtractedMessage>> {
        let exists = tokio::time::timeout(
            self.timeouts.select,
            session::examine_mailbox(session, "INBOX"),
        )
        .await
        .map_err(|_| Error::SelectTimeout {
            mailbox: "INBOX".to_string(),
            timeout: self.timeouts.select,
        })??;

        if exists == 0 {
            debug!("Mailbox is empty");
            return Ok(None);
        }

        let range = if exists > FETCH_WINDOW {
            format!("{}:*", exists - FETCH_WINDOW + 1)
        } else {
            "1:*".to_string()
        };

        let mut stream = tokio::time::timeout(
            self.timeouts.fetch,
            session::fetch_window(session, &range),
        )
        .await
        .map_err(|_| Error::FetchTimeout {
            range: range.clone(),
            timeout: self.timeouts.fetch,
        })??;

        let mut latest: Option<ExtractedMessage> = None;

        while let Some(item) = stream.next().await {
            let message = item.map_err(|source| Error::FetchMessage { source })?;

            let Some(raw) = message.body() else {
                debug!("Message has no body, skipping");
                continue;
            };

            // A malformed message is logged and skipped; it must not abort
            // the rest of the window.
            let parsed = match parser::parse_message(raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(error = %e, "Failed to parse message, skipping");
                    continue;
                }
            };

            if let Some(candidate) = self.process_message(parsed, mailbox) {
                // Strictly greater: on a timestamp tie the first-seen
                // candidate wins.
                let newer = latest
                    .as_ref()
                    .map_or(true, |cur| candidate.received_at > cur.received_at);
                if newer {
                    latest = Some(candidate);
                }
            }
        }

        Ok(latest)
    }

    /// Applies the sender filter and code extraction to one parsed message.
    ///
    /// Returns `None` for sender-ineligible messages; eligible messages
    /// without a code still participate in latest-message tracking.
    fn process_message(
        &self,
        parsed: ParsedEmail,
        mailbox: &MailboxConfig,
    ) -> Option<ExtractedMessage> {
        let platform = mailbox.platform();
        let rule = self.rules.for_platform(platform);

        if !sender_is_allowed(&parsed.sender, platform, rule) {
            debug!(sender = %parsed.sender, "Skipping message from ineligible sender");
            return None;
        }

        let code = extract_code(&parsed.body, &parsed.subject, rule);

        Some(ExtractedMessage {
            subject: parsed.subject,
            sender: parsed.sender,
            recipient: parsed.recipient,
            body: truncate_chars(&parsed.body, MAX_BODY_CHARS),
            code,
            received_at: parsed.date,
        })
    }
}

#[async_trait]
impl FetchMail for ImapFetcher {
    #[instrument(
        name = "ImapFetcher::fetch_latest",
        skip_all,
        fields(
            mailbox_id = mailbox.id,
            address = %mailbox.address(),
            imap_host = %mailbox.host,
            platform = mailbox.platform().unwrap_or("-")
        )
    )]
    async fn fetch_latest(&self, mailbox: &MailboxConfig) -> Result<Option<ExtractedMessage>> {
        let mut session = self.open_session(mailbox).await?;

        let outcome = self.scan_inbox(&mut session, mailbox).await;

        // The session is closed on every exit path; a failed logout is
        // logged, never surfaced over the scan outcome.
        match tokio::time::timeout(self.timeouts.logout, session::logout(&mut session)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Logout failed"),
            Err(_) => warn!(timeout = ?self.timeouts.logout, "Logout timed out"),
        }

        outcome
    }
}

/// Truncates a string to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
