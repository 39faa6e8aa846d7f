//! Operator notification queue.
//!
//! Append-only, newest first, deduplicated by source event. "Mark all
//! read" clears the queue entirely; a cleared queue reads as zero
//! unread.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Notification category, driving display treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Critical,
    Warning,
    Info,
    Hil,
}

/// A single entry in the notification queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: Uuid,

    pub category: NotificationCategory,

    pub title: String,

    /// Dedup key derived from the originating event
    pub source_key: String,

    pub created_at: DateTime<Utc>,

    pub read: bool,
}

impl NotificationEvent {
    /// Build a notification keyed to its originating event.
    ///
    /// `source` identifies what triggered the notification (a signal id,
    /// a HIL request id); a second notification for the same source and
    /// category is dropped by the queue.
    pub fn new(
        category: NotificationCategory,
        title: impl Into<String>,
        source: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            title: title.into(),
            source_key: source_key(category, source),
            created_at: Utc::now(),
            read: false,
        }
    }
}

/// Dedup key: first 16 hex chars of SHA256 over category and source id.
fn source_key(category: NotificationCategory, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{:?}", category).as_bytes());
    hasher.update(b":");
    hasher.update(source.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

/// Capped, newest-first notification queue.
#[derive(Debug)]
pub struct NotificationQueue {
    items: VecDeque<NotificationEvent>,

    /// Source keys already notified; survives mark_all_read so cleared
    /// events do not reappear
    seen: HashSet<String>,

    /// Maximum retained entries
    retain: usize,
}

impl NotificationQueue {
    pub fn new(retain: usize) -> Self {
        Self {
            items: VecDeque::new(),
            seen: HashSet::new(),
            retain,
        }
    }

    /// Prepend a notification. Returns false when the source event was
    /// already notified and the entry was dropped.
    pub fn push(&mut self, event: NotificationEvent) -> bool {
        if !self.seen.insert(event.source_key.clone()) {
            return false;
        }

        self.items.push_front(event);
        while self.items.len() > self.retain {
            self.items.pop_back();
        }
        true
    }

    /// Clear the queue. Observers treat a cleared queue as zero unread.
    pub fn mark_all_read(&mut self) {
        self.items.clear();
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    /// Current entries, newest first.
    pub fn items(&self) -> impl Iterator<Item = &NotificationEvent> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let mut queue = NotificationQueue::new(10);
        queue.push(NotificationEvent::new(
            NotificationCategory::Info,
            "first",
            "sig_1",
        ));
        queue.push(NotificationEvent::new(
            NotificationCategory::Critical,
            "second",
            "sig_2",
        ));

        let titles: Vec<_> = queue.items().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[test]
    fn test_dedup_by_source_event() {
        let mut queue = NotificationQueue::new(10);
        assert!(queue.push(NotificationEvent::new(
            NotificationCategory::Hil,
            "approval needed",
            "hil_1",
        )));
        assert!(!queue.push(NotificationEvent::new(
            NotificationCategory::Hil,
            "approval needed (again)",
            "hil_1",
        )));

        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_same_source_different_category_is_distinct() {
        let mut queue = NotificationQueue::new(10);
        assert!(queue.push(NotificationEvent::new(
            NotificationCategory::Info,
            "signal seen",
            "sig_1",
        )));
        assert!(queue.push(NotificationEvent::new(
            NotificationCategory::Critical,
            "signal escalated",
            "sig_1",
        )));

        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut queue = NotificationQueue::new(3);
        for i in 0..5 {
            queue.push(NotificationEvent::new(
                NotificationCategory::Info,
                format!("n{}", i),
                &format!("sig_{}", i),
            ));
        }

        assert_eq!(queue.len(), 3);
        let titles: Vec<_> = queue.items().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["n4", "n3", "n2"]);
    }

    #[test]
    fn test_mark_all_read_clears() {
        let mut queue = NotificationQueue::new(10);
        queue.push(NotificationEvent::new(
            NotificationCategory::Warning,
            "drift detected",
            "sig_1",
        ));
        assert_eq!(queue.unread_count(), 1);

        queue.mark_all_read();
        assert!(queue.is_empty());
        assert_eq!(queue.unread_count(), 0);

        // A cleared source event stays cleared
        assert!(!queue.push(NotificationEvent::new(
            NotificationCategory::Warning,
            "drift detected",
            "sig_1",
        )));
    }
}
