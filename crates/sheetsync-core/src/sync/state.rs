//! Outstanding intent tracking
//!
//! Every intent handed to the transport gets an entry here until exactly one
//! `ack` or `error` arrives for it, or until it times out. Intents that timed
//! out are remembered for one more timeout window so a late answer can be
//! recognised and ignored.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::message::{Intent, IntentBody};

/// Label used when an answer arrives for an intent we never sent
pub const UNKNOWN_INTENT_LABEL: &str = "Intent";

/// Client-side record of an intent awaiting its answer
#[derive(Debug, Clone)]
pub struct OutstandingIntent {
    /// Human-readable label for feedback messages
    pub label: String,
    pub sent_at: Instant,
    /// An ack flips the GM-authenticated flag
    pub authenticates_gm: bool,
    /// An optimistic roll entry is waiting on this intent
    pub optimistic_roll: bool,
}

impl OutstandingIntent {
    pub fn for_intent(intent: &Intent, sent_at: Instant) -> Self {
        Self {
            label: intent.body.label(),
            sent_at,
            authenticates_gm: matches!(intent.body, IntentBody::AuthenticateGm { .. }),
            optimistic_roll: matches!(intent.body, IntentBody::SubmitRoll { .. }),
        }
    }
}

/// Outstanding and timed-out intents by id
#[derive(Debug, Default)]
pub struct IntentTable {
    outstanding: HashMap<String, OutstandingIntent>,
    /// Timed-out intent ids and when they timed out
    expired: HashMap<String, Instant>,
}

impl IntentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an intent. Re-sending an id replaces the earlier record.
    pub fn record(&mut self, intent_id: impl Into<String>, entry: OutstandingIntent) {
        let intent_id = intent_id.into();
        self.expired.remove(&intent_id);
        self.outstanding.insert(intent_id, entry);
    }

    /// Stop tracking an intent that just got its answer
    pub fn resolve(&mut self, intent_id: &str) -> Option<OutstandingIntent> {
        self.outstanding.remove(intent_id)
    }

    pub fn contains(&self, intent_id: &str) -> bool {
        self.outstanding.contains_key(intent_id)
    }

    /// Returns true, once, if the intent had already timed out
    pub fn take_expired(&mut self, intent_id: &str) -> bool {
        self.expired.remove(intent_id).is_some()
    }

    /// Remove every intent sent more than `timeout` before `now`, oldest first.
    ///
    /// Timed-out markers older than another `timeout` are dropped here too.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<(String, OutstandingIntent)> {
        self.expired
            .retain(|_, expired_at| now.saturating_duration_since(*expired_at) < timeout);

        let overdue: Vec<String> = self
            .outstanding
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.sent_at) >= timeout)
            .map(|(id, _)| id.clone())
            .collect();

        let mut expired: Vec<(String, OutstandingIntent)> = overdue
            .into_iter()
            .filter_map(|id| self.outstanding.remove(&id).map(|entry| (id, entry)))
            .collect();
        expired.sort_by_key(|(_, entry)| entry.sent_at);

        for (id, _) in &expired {
            self.expired.insert(id.clone(), now);
        }
        expired
    }

    /// Number of timed-out ids still remembered
    pub fn expired_len(&self) -> usize {
        self.expired.len()
    }

    pub fn len(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outstanding.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str, sent_at: Instant) -> OutstandingIntent {
        OutstandingIntent {
            label: label.to_string(),
            sent_at,
            authenticates_gm: false,
            optimistic_roll: false,
        }
    }

    #[test]
    fn test_for_intent_flags() {
        let now = Instant::now();
        let auth = OutstandingIntent::for_intent(&Intent::authenticate_gm("a", "pw"), now);
        assert!(auth.authenticates_gm);
        assert!(!auth.optimistic_roll);
        assert_eq!(auth.label, "GM authentication");

        let spawn = OutstandingIntent::for_intent(&Intent::spawn_encounter("b", "enc"), now);
        assert!(!spawn.authenticates_gm);
        assert_eq!(spawn.label, "Encounter spawn");
    }

    #[test]
    fn test_resolve_removes_entry() {
        let mut table = IntentTable::new();
        table.record("a", entry("A", Instant::now()));
        assert!(table.contains("a"));

        assert_eq!(table.resolve("a").unwrap().label, "A");
        assert!(table.resolve("a").is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_expire_only_overdue_oldest_first() {
        let mut table = IntentTable::new();
        let start = Instant::now();
        table.record("late", entry("late", start + Duration::from_secs(2)));
        table.record("early", entry("early", start));
        table.record("fresh", entry("fresh", start + Duration::from_secs(9)));

        let expired = table.expire(start + Duration::from_secs(10), Duration::from_secs(5));
        let ids: Vec<&str> = expired.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert_eq!(table.len(), 1);

        assert!(table.take_expired("early"));
        assert!(!table.take_expired("early"));
        assert!(!table.take_expired("fresh"));
    }

    #[test]
    fn test_expired_markers_are_dropped_after_another_window() {
        let mut table = IntentTable::new();
        let start = Instant::now();
        let timeout = Duration::from_secs(5);
        table.record("lost", entry("lost", start));

        table.expire(start + Duration::from_secs(6), timeout);
        assert_eq!(table.expired_len(), 1);

        // Still inside the second window
        table.expire(start + Duration::from_secs(10), timeout);
        assert_eq!(table.expired_len(), 1);

        table.expire(start + Duration::from_secs(11), timeout);
        assert_eq!(table.expired_len(), 0);
        assert!(!table.take_expired("lost"));
    }

    #[test]
    fn test_record_clears_expired_marker() {
        let mut table = IntentTable::new();
        let start = Instant::now();
        table.record("a", entry("A", start));
        table.expire(start + Duration::from_secs(60), Duration::from_secs(1));

        table.record("a", entry("A", start + Duration::from_secs(60)));
        assert!(!table.take_expired("a"));
        assert!(table.contains("a"));
    }
}
