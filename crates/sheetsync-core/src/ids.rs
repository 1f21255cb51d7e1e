//! Identifier sources
//!
//! Intent ids, feedback ids, and ids minted by the simulated backend all come
//! from an [`IdSource`], so tests can swap in a deterministic counter.

use std::collections::HashMap;

/// Generates unique string identifiers with a readable prefix
pub trait IdSource: Send {
    /// Produce the next identifier, e.g. `instance_3`
    fn next_id(&mut self, prefix: &str) -> String;
}

/// Random identifiers backed by UUID v4
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self, prefix: &str) -> String {
        format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..12])
    }
}

/// Deterministic identifiers: one counter per prefix, starting at 1
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    counters: HashMap<String, u64>,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        *counter += 1;
        format!("{}_{}", prefix, counter)
    }
}
