//! Tallies for operations applied to many records at once.
//!
//! A bulk request never stops at the first failure: every id is attempted
//! and the outcome lists what worked and what did not, with a reason.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, id: impl Into<String>) {
        self.succeeded.push(id.into());
    }

    pub fn record_failure(&mut self, id: impl Into<String>, reason: impl ToString) {
        self.failed.push(BulkFailure {
            id: id.into(),
            reason: reason.to_string(),
        });
    }

    /// Records the result of one id.
    pub fn record<T, E: ToString>(&mut self, id: &str, result: Result<T, E>) {
        match result {
            Ok(_) => self.record_success(id),
            Err(e) => self.record_failure(id, e),
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Removes repeated and blank ids, keeping first-seen order.
pub fn dedup_ids<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.as_ref().trim())
        .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally() {
        let mut outcome = BulkOutcome::new();
        outcome.record::<(), String>("a", Ok(()));
        outcome.record::<(), String>("b", Err("not found".to_string()));
        outcome.record_success("c");

        assert_eq!(outcome.total(), 3);
        assert_eq!(outcome.success_count(), 2);
        assert_eq!(outcome.failure_count(), 1);
        assert_eq!(outcome.failed[0].reason, "not found");
        assert!(!outcome.all_succeeded());
    }

    #[test]
    fn test_dedup_ids() {
        let ids = dedup_ids(&["a", "b", " a ", "", "c", "b"]);
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_wire_shape() {
        let mut outcome = BulkOutcome::new();
        outcome.record_failure("x", "archived");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["failed"][0]["id"], "x");
        assert!(json["succeeded"].as_array().unwrap().is_empty());
    }
}
