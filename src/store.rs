//! Persistence boundary for mailbox configurations and stored messages.
//!
//! The core consumes the [`MailboxStore`] trait and never talks to a
//! database directly. [`MemoryStore`] is the reference implementation used
//! by the tests; a production deployment supplies its own implementation
//! over its relational store.

use crate::config::MailboxConfig;
use crate::error::Result;
use crate::fetcher::ExtractedMessage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Persisted projection of the latest [`ExtractedMessage`] for a mailbox.
///
/// Rows accumulate as history; only the newest per mailbox (by
/// `received_at`) is surfaced as "current".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// Generated row id.
    pub id: u64,
    /// Owning mailbox id.
    pub mailbox_id: u64,
    /// Message subject.
    pub subject: String,
    /// Sender display string.
    pub sender: String,
    /// Truncated message body.
    pub body: String,
    /// Extracted verification code, if any.
    pub code: Option<String>,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
}

/// Persistence operations the poller depends on.
///
/// Writes are append-only inserts from possibly-concurrent pollers; the
/// retention sweep deletes the oldest rows by `received_at` and treats
/// already-deleted rows as a no-op.
#[async_trait]
pub trait MailboxStore: Send + Sync {
    /// Lists every mailbox with `active = true`.
    async fn list_active_mailboxes(&self) -> Result<Vec<MailboxConfig>>;

    /// Looks up one mailbox by id, active or not.
    async fn get_mailbox(&self, id: u64) -> Result<Option<MailboxConfig>>;

    /// Inserts a new stored message row and returns its id.
    async fn insert_stored_message(
        &self,
        mailbox_id: u64,
        message: &ExtractedMessage,
    ) -> Result<u64>;

    /// Updates a mailbox's last-checked timestamp.
    async fn touch_last_checked(&self, mailbox_id: u64, at: DateTime<Utc>) -> Result<()>;

    /// Deletes the oldest stored messages beyond `capacity` rows globally.
    /// Returns the number of deleted rows.
    async fn prune_stored_messages_beyond(&self, capacity: usize) -> Result<usize>;
}

#[derive(Debug, Default)]
struct MemoryState {
    mailboxes: Vec<MailboxConfig>,
    messages: Vec<StoredMessage>,
    next_message_id: u64,
}

/// In-memory [`MailboxStore`] implementation.
///
/// # Example
///
/// ```
/// use codewatch::store::{MailboxStore, MemoryStore};
/// use codewatch::MailboxConfig;
///
/// # async fn example() -> codewatch::Result<()> {
/// let store = MemoryStore::new();
/// store.add_mailbox(
///     MailboxConfig::builder()
///         .id(1)
///         .address("codes@example.com")
///         .secret("x")
///         .host("mail.example.com")
///         .build()?,
/// );
/// assert_eq!(store.list_active_mailboxes().await?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mailbox configuration.
    pub fn add_mailbox(&self, mailbox: MailboxConfig) {
        self.state
            .lock()
            .expect("store lock poisoned")
            .mailboxes
            .push(mailbox);
    }

    /// Returns all stored message rows (insertion order).
    #[must_use]
    pub fn messages(&self) -> Vec<StoredMessage> {
        self.state
            .lock()
            .expect("store lock poisoned")
            .messages
            .clone()
    }

    /// Resolves the "current" message for a mailbox: the stored row with the
    /// latest `received_at`.
    #[must_use]
    pub fn current_message(&self, mailbox_id: u64) -> Option<StoredMessage> {
        let state = self.state.lock().expect("store lock poisoned");
        state
            .messages
            .iter()
            .filter(|m| m.mailbox_id == mailbox_id)
            .max_by_key(|m| (m.received_at, m.id))
            .cloned()
    }
}

#[async_trait]
impl MailboxStore for MemoryStore {
    async fn list_active_mailboxes(&self) -> Result<Vec<MailboxConfig>> {
        let state = self.state.lock().expect("store lock poisoned");
        Ok(state
            .mailboxes
            .iter()
            .filter(|m| m.active)
            .cloned()
            .collect())
    }

    async fn get_mailbox(&self, id: u64) -> Result<Option<MailboxConfig>> {
        let state = self.state.lock().expect("store lock poisoned");
        Ok(state.mailboxes.iter().find(|m| m.id == id).cloned())
    }

    async fn insert_stored_message(
        &self,
        mailbox_id: u64,
        message: &ExtractedMessage,
    ) -> Result<u64> {
        let mut state = self.state.lock().expect("store lock poisoned");
        state.next_message_id += 1;
        let id = state.next_message_id;
        state.messages.push(StoredMessage {
            id,
            mailbox_id,
            subject: message.subject.clone(),
            sender: message.sender.clone(),
            body: message.body.clone(),
            code: message.code.clone(),
            received_at: message.received_at,
        });
        Ok(id)
    }

    async fn touch_last_checked(&self, mailbox_id: u64, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().expect("store lock poisoned");
        if let Some(mailbox) = state.mailboxes.iter_mut().find(|m| m.id == mailbox_id) {
            mailbox.last_checked = Some(at);
        }
        Ok(())
    }

    async fn prune_stored_messages_beyond(&self, capacity: usize) -> Result<usize> {
        let mut state = self.state.lock().expect("store lock poisoned");
        let total = state.messages.len();
        if total <= capacity {
            return Ok(0);
        }

        // Stable ordering key: received_at, then row id for equal timestamps.
        state
            .messages
            .sort_by_key(|m| std::cmp::Reverse((m.received_at, m.id)));
        state.messages.truncate(capacity);
        Ok(total - capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mailbox(id: u64, active: bool) -> MailboxConfig {
        MailboxConfig::builder()
            .id(id)
            .address("codes@example.com")
            .secret("x")
            .host("mail.example.com")
            .active(active)
            .build()
            .unwrap()
    }

    fn message(received_minute: u32) -> ExtractedMessage {
        ExtractedMessage {
            subject: "Subject".into(),
            sender: "sender@example.com".into(),
            recipient: None,
            body: "Body".into(),
            code: Some("987654".into()),
            received_at: Utc
                .with_ymd_and_hms(2026, 8, 25, 12, received_minute, 0)
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn test_list_active_filters_inactive() {
        let store = MemoryStore::new();
        store.add_mailbox(mailbox(1, true));
        store.add_mailbox(mailbox(2, false));
        store.add_mailbox(mailbox(3, true));

        let active = store.list_active_mailboxes().await.unwrap();
        let ids: Vec<u64> = active.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_get_mailbox_includes_inactive() {
        let store = MemoryStore::new();
        store.add_mailbox(mailbox(2, false));
        assert!(store.get_mailbox(2).await.unwrap().is_some());
        assert!(store.get_mailbox(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.insert_stored_message(1, &message(0)).await.unwrap();
        let b = store.insert_stored_message(1, &message(1)).await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_touch_last_checked() {
        let store = MemoryStore::new();
        store.add_mailbox(mailbox(1, true));
        let at = Utc.with_ymd_and_hms(2026, 8, 25, 13, 0, 0).unwrap();
        store.touch_last_checked(1, at).await.unwrap();
        let stored = store.get_mailbox(1).await.unwrap().unwrap();
        assert_eq!(stored.last_checked, Some(at));
    }

    #[tokio::test]
    async fn test_prune_keeps_most_recent() {
        let store = MemoryStore::new();
        for minute in 0..10 {
            store.insert_stored_message(1, &message(minute)).await.unwrap();
        }

        let removed = store.prune_stored_messages_beyond(4).await.unwrap();
        assert_eq!(removed, 6);

        let remaining = store.messages();
        assert_eq!(remaining.len(), 4);
        // Exactly the 4 most recent by received_at survive
        let mut minutes: Vec<u32> = remaining
            .iter()
            .map(|m| m.received_at.format("%M").to_string().parse().unwrap())
            .collect();
        minutes.sort_unstable();
        assert_eq!(minutes, vec![6, 7, 8, 9]);
    }

    #[tokio::test]
    async fn test_prune_under_capacity_is_noop() {
        let store = MemoryStore::new();
        store.insert_stored_message(1, &message(0)).await.unwrap();
        let removed = store.prune_stored_messages_beyond(100).await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(store.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_current_message_resolves_latest_received() {
        let store = MemoryStore::new();
        store.insert_stored_message(1, &message(5)).await.unwrap();
        store.insert_stored_message(1, &message(9)).await.unwrap();
        store.insert_stored_message(1, &message(7)).await.unwrap();
        store.insert_stored_message(2, &message(30)).await.unwrap();

        let current = store.current_message(1).unwrap();
        assert_eq!(
            current.received_at,
            Utc.with_ymd_and_hms(2026, 8, 25, 12, 9, 0).unwrap()
        );
    }
}
