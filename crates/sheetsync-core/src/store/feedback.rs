//! Intent feedback queue
//!
//! Bounded, newest-first list of transient feedback items. A resolution
//! (success or error) supersedes the pending placeholders of its own intent,
//! located through an explicit intent id -> feedback id table.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Maximum number of feedback items kept
pub const MAX_INTENT_FEEDBACK_ITEMS: usize = 6;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Pending,
    Success,
    Error,
}

/// UI-only record of one step in an intent's lifecycle
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntentFeedbackItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,
    pub status: FeedbackStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl IntentFeedbackItem {
    pub fn new(
        id: impl Into<String>,
        intent_id: Option<String>,
        status: FeedbackStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            intent_id,
            status,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeedbackQueue {
    items: VecDeque<IntentFeedbackItem>,
    /// Pending feedback ids per intent id
    pending_by_intent: HashMap<String, Vec<String>>,
}

impl FeedbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new item, superseding and evicting as needed
    pub fn push(&mut self, item: IntentFeedbackItem) {
        match (&item.intent_id, item.status) {
            (Some(intent_id), FeedbackStatus::Pending) => {
                self.pending_by_intent
                    .entry(intent_id.clone())
                    .or_default()
                    .push(item.id.clone());
            }
            (Some(intent_id), _) => {
                if let Some(superseded) = self.pending_by_intent.remove(intent_id) {
                    self.items.retain(|existing| !superseded.contains(&existing.id));
                }
            }
            (None, _) => {}
        }

        self.items.push_front(item);

        while self.items.len() > MAX_INTENT_FEEDBACK_ITEMS {
            if let Some(evicted) = self.items.pop_back() {
                self.forget(&evicted);
            }
        }
    }

    /// Remove an item by feedback id
    pub fn dismiss(&mut self, id: &str) -> Option<IntentFeedbackItem> {
        let position = self.items.iter().position(|item| item.id == id)?;
        let removed = self.items.remove(position)?;
        self.forget(&removed);
        Some(removed)
    }

    fn forget(&mut self, item: &IntentFeedbackItem) {
        if item.status != FeedbackStatus::Pending {
            return;
        }
        let Some(ref intent_id) = item.intent_id else {
            return;
        };
        if let Some(ids) = self.pending_by_intent.get_mut(intent_id) {
            ids.retain(|id| id != &item.id);
            if ids.is_empty() {
                self.pending_by_intent.remove(intent_id);
            }
        }
    }

    /// Items newest first
    pub fn iter(&self) -> impl Iterator<Item = &IntentFeedbackItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn latest(&self) -> Option<&IntentFeedbackItem> {
        self.items.front()
    }

    /// All items for one intent, newest first
    pub fn for_intent<'a>(
        &'a self,
        intent_id: &'a str,
    ) -> impl Iterator<Item = &'a IntentFeedbackItem> + 'a {
        self.items
            .iter()
            .filter(move |item| item.intent_id.as_deref() == Some(intent_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, intent: Option<&str>, status: FeedbackStatus) -> IntentFeedbackItem {
        IntentFeedbackItem::new(id, intent.map(str::to_string), status, id)
    }

    #[test]
    fn test_push_is_newest_first() {
        let mut queue = FeedbackQueue::new();
        queue.push(item("f1", Some("a"), FeedbackStatus::Pending));
        queue.push(item("f2", Some("b"), FeedbackStatus::Pending));

        let ids: Vec<&str> = queue.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["f2", "f1"]);
    }

    #[test]
    fn test_resolution_supersedes_own_pending() {
        let mut queue = FeedbackQueue::new();
        queue.push(item("f1", Some("a"), FeedbackStatus::Pending));
        queue.push(item("f2", Some("b"), FeedbackStatus::Pending));
        queue.push(item("f3", Some("a"), FeedbackStatus::Success));

        let ids: Vec<&str> = queue.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["f3", "f2"]);
        assert_eq!(queue.for_intent("a").count(), 1);
    }

    #[test]
    fn test_pending_does_not_supersede_pending() {
        let mut queue = FeedbackQueue::new();
        queue.push(item("f1", Some("a"), FeedbackStatus::Pending));
        queue.push(item("f2", Some("a"), FeedbackStatus::Pending));
        assert_eq!(queue.len(), 2);

        queue.push(item("f3", Some("a"), FeedbackStatus::Error));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.latest().unwrap().status, FeedbackStatus::Error);
    }

    #[test]
    fn test_untagged_items_never_supersede() {
        let mut queue = FeedbackQueue::new();
        queue.push(item("f1", Some("a"), FeedbackStatus::Pending));
        queue.push(item("f2", None, FeedbackStatus::Error));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_seventh_push_evicts_oldest() {
        let mut queue = FeedbackQueue::new();
        for n in 1..=7 {
            queue.push(item(&format!("f{}", n), Some(&format!("i{}", n)), FeedbackStatus::Pending));
            assert!(queue.len() <= MAX_INTENT_FEEDBACK_ITEMS);
        }

        assert_eq!(queue.len(), MAX_INTENT_FEEDBACK_ITEMS);
        assert!(queue.iter().all(|i| i.id != "f1"));
        assert!(queue.pending_by_intent.get("i1").is_none());
    }

    #[test]
    fn test_dismiss_removes_item_and_correlation() {
        let mut queue = FeedbackQueue::new();
        queue.push(item("f1", Some("a"), FeedbackStatus::Pending));
        assert!(queue.dismiss("f1").is_some());
        assert!(queue.dismiss("f1").is_none());
        assert!(queue.is_empty());
        assert!(queue.pending_by_intent.is_empty());
    }
}
