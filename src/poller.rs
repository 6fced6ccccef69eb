//! Polling orchestration across all monitored mailboxes.
//!
//! [`Poller`] ties the pieces together: it loads mailbox configurations from
//! the store, runs the mail fetcher against each, persists results, applies
//! the retention sweep, and broadcasts change events. It is invoked both by
//! an external fixed-interval scheduler ([`poll_all`](Poller::poll_all)) and
//! by on-demand requests ([`poll_one`](Poller::poll_one)).
//!
//! Concurrent polls against the same mailbox are allowed: both insert a row
//! and the consumer-facing "current" view resolves by latest `received_at`,
//! so racing polls are wasteful but never incorrect.

use crate::config::{MailboxConfig, PollerConfig};
use crate::error::{Error, Result};
use crate::fetcher::FetchMail;
use crate::notify::{ChangeEvent, SinkRegistry};
use crate::store::MailboxStore;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Per-mailbox outcome of one poll attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResult {
    /// The polled mailbox.
    pub mailbox_id: u64,
    /// Mailbox address, for reporting.
    pub address: String,
    /// Platform label, for reporting.
    pub platform: Option<String>,
    /// Whether the check completed without error.
    pub success: bool,
    /// Extracted code from the latest eligible message, if any.
    pub code: Option<String>,
    /// Error description when `success` is false.
    pub error: Option<String>,
    /// When the check finished.
    pub timestamp: DateTime<Utc>,
}

/// Orchestrates poll cycles over every active mailbox.
///
/// # Example
///
/// ```no_run
/// use codewatch::{ImapFetcher, Poller};
/// use codewatch::rules::RuleBook;
/// use codewatch::store::MemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() -> codewatch::Result<()> {
/// let store = Arc::new(MemoryStore::new());
/// let fetcher = Arc::new(ImapFetcher::new(RuleBook::with_defaults()));
/// let poller = Poller::new(store, fetcher);
///
/// for result in poller.poll_all().await? {
///     println!("{}: {:?}", result.address, result.code);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Poller<S, F> {
    store: Arc<S>,
    fetcher: Arc<F>,
    sinks: SinkRegistry,
    config: PollerConfig,
}

impl<S, F> Poller<S, F>
where
    S: MailboxStore,
    F: FetchMail,
{
    /// Creates a poller with default configuration.
    #[must_use]
    pub fn new(store: Arc<S>, fetcher: Arc<F>) -> Self {
        Self {
            store,
            fetcher,
            sinks: SinkRegistry::new(),
            config: PollerConfig::default(),
        }
    }

    /// Overrides the poller configuration.
    #[must_use]
    pub fn with_config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the notification sink registry for subscription management.
    #[must_use]
    pub fn sinks(&self) -> &SinkRegistry {
        &self.sinks
    }

    /// Checks every active mailbox and returns one result per mailbox.
    ///
    /// Per-mailbox failures are captured in the corresponding [`PollResult`]
    /// and never abort the batch; the worst outcome is "zero mailboxes
    /// updated, all errors reported".
    ///
    /// # Errors
    ///
    /// Fails only if the active-mailbox listing itself fails (nothing was
    /// polled in that case).
    #[instrument(name = "Poller::poll_all", skip(self))]
    pub async fn poll_all(&self) -> Result<Vec<PollResult>> {
        let mailboxes = self.store.list_active_mailboxes().await?;
        debug!(mailbox_count = mailboxes.len(), "Starting poll cycle");

        let results = join_all(mailboxes.iter().map(|m| self.poll_mailbox(m))).await;

        for result in &results {
            if result.success {
                self.emit_change(result);
            }
        }

        Ok(results)
    }

    /// Checks a single mailbox by id, active or not.
    ///
    /// Unlike [`poll_all`](Self::poll_all), the fetch error is propagated to
    /// the caller; manual checks want the real failure, not a report entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailboxNotFound`] for an unknown id, otherwise any
    /// connection/fetch/storage error from the check.
    #[instrument(name = "Poller::poll_one", skip(self))]
    pub async fn poll_one(&self, mailbox_id: u64) -> Result<PollResult> {
        let mailbox = self
            .store
            .get_mailbox(mailbox_id)
            .await?
            .ok_or(Error::MailboxNotFound { id: mailbox_id })?;

        let code = self.check_mailbox(&mailbox).await?;

        let result = PollResult {
            mailbox_id: mailbox.id,
            address: mailbox.address().to_string(),
            platform: mailbox.platform.clone(),
            success: true,
            code,
            error: None,
            timestamp: Utc::now(),
        };

        self.emit_change(&result);

        Ok(result)
    }

    /// Runs one mailbox check, converting the outcome into a report entry.
    async fn poll_mailbox(&self, mailbox: &MailboxConfig) -> PollResult {
        match self.check_mailbox(mailbox).await {
            Ok(code) => PollResult {
                mailbox_id: mailbox.id,
                address: mailbox.address().to_string(),
                platform: mailbox.platform.clone(),
                success: true,
                code,
                error: None,
                timestamp: Utc::now(),
            },
            Err(e) => {
                warn!(
                    mailbox_id = mailbox.id,
                    address = %mailbox.address(),
                    error = %e,
                    category = %e.category(),
                    "Mailbox check failed"
                );
                PollResult {
                    mailbox_id: mailbox.id,
                    address: mailbox.address().to_string(),
                    platform: mailbox.platform.clone(),
                    success: false,
                    code: None,
                    error: Some(e.to_string()),
                    timestamp: Utc::now(),
                }
            }
        }
    }

    /// Fetches, persists, and sweeps for one mailbox.
    ///
    /// The mailbox's last-checked timestamp is updated on success *and* on
    /// fetch failure, so a dead mailbox is not hot-loop retried within the
    /// same cycle.
    async fn check_mailbox(&self, mailbox: &MailboxConfig) -> Result<Option<String>> {
        let outcome = self.fetch_and_store(mailbox).await;

        if outcome.is_err() {
            if let Err(e) = self.store.touch_last_checked(mailbox.id, Utc::now()).await {
                warn!(
                    mailbox_id = mailbox.id,
                    error = %e,
                    "Failed to update last-checked after fetch failure"
                );
            }
        }

        outcome
    }

    async fn fetch_and_store(&self, mailbox: &MailboxConfig) -> Result<Option<String>> {
        let deadline = self.config.mailbox_deadline;

        let fetched = tokio::time::timeout(deadline, self.fetcher.fetch_latest(mailbox))
            .await
            .map_err(|_| Error::MailboxDeadline {
                address: mailbox.address().to_string(),
                timeout: deadline,
            })??;

        let code = match fetched {
            Some(message) => {
                let code = message.code.clone();
                self.store.insert_stored_message(mailbox.id, &message).await?;

                // Sweep failures are logged, never propagated: a full store
                // is preferable to a failed poll.
                match self
                    .store
                    .prune_stored_messages_beyond(self.config.retention_cap)
                    .await
                {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, "Retention sweep removed old messages"),
                    Err(e) => warn!(error = %e, "Retention sweep failed"),
                }

                code
            }
            None => {
                debug!(mailbox_id = mailbox.id, "No eligible message found");
                None
            }
        };

        self.store.touch_last_checked(mailbox.id, Utc::now()).await?;

        Ok(code)
    }

    fn emit_change(&self, result: &PollResult) {
        self.sinks.broadcast(&ChangeEvent {
            mailbox_id: result.mailbox_id,
            code: result.code.clone(),
            timestamp: result.timestamp,
        });
    }
}

impl<S, F> std::fmt::Debug for Poller<S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("config", &self.config)
            .field("sinks", &self.sinks)
            .finish_non_exhaustive()
    }
}
