//! History policy and transition journal.
//!
//! [`HistoryMode`] decides whether a composite state remembers its active
//! children across an exit/re-entry cycle. [`TransitionLog`] is an
//! immutable record of the transitions a machine has settled.

use super::value::StateValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Whether a node remembers its active children when it exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    /// Re-entry uses default-initial selection.
    #[default]
    None,
    /// Re-entry restores the previously active immediate child only.
    Shallow,
    /// Re-entry restores the whole previously active subtree.
    Deep,
}

/// Record of a single settled transition.
///
/// # Example
///
/// ```rust
/// use canopy::core::{StateValue, TransitionRecord};
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     from: StateValue::leaf("off"),
///     to: StateValue::leaf("on"),
///     target: "on".to_string(),
///     timestamp: Utc::now(),
/// };
/// assert_eq!(record.target, "on");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Machine value before the transition
    pub from: StateValue,
    /// Machine value after the transition settled
    pub to: StateValue,
    /// The requested target id
    pub target: String,
    /// When the transition settled
    pub timestamp: DateTime<Utc>,
}

/// Ordered, optionally bounded journal of transitions.
///
/// The journal is immutable: [`TransitionLog::record`] returns a new log
/// with the record appended, dropping the oldest entries past capacity.
///
/// ```rust
/// use canopy::core::{StateValue, TransitionLog, TransitionRecord};
/// use chrono::Utc;
///
/// let log = TransitionLog::new();
/// let next = log.record(TransitionRecord {
///     from: StateValue::leaf("off"),
///     to: StateValue::leaf("on"),
///     target: "on".to_string(),
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(log.records().len(), 0);
/// assert_eq!(next.records().len(), 1);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionLog {
    records: Vec<TransitionRecord>,
    capacity: Option<usize>,
}

impl TransitionLog {
    /// Unbounded journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Journal keeping at most `capacity` most recent records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity: Some(capacity),
        }
    }

    /// Record a transition, returning a new journal.
    pub fn record(&self, record: TransitionRecord) -> Self {
        let mut records = self.records.clone();
        records.push(record);
        if let Some(capacity) = self.capacity {
            let overflow = records.len().saturating_sub(capacity);
            records.drain(..overflow);
        }
        Self {
            records,
            capacity: self.capacity,
        }
    }

    /// Values traversed: the first `from`, then each `to`.
    pub fn get_path(&self) -> Vec<&StateValue> {
        let mut path = Vec::new();
        if let Some(first) = self.records.first() {
            path.push(&first.from);
        }
        for record in &self.records {
            path.push(&record.to);
        }
        path
    }

    /// Time between the first and last recorded transition.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.first()?, self.records.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(from: &str, to: &str) -> TransitionRecord {
        TransitionRecord {
            from: StateValue::leaf(from),
            to: StateValue::leaf(to),
            target: to.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn new_log_is_empty() {
        let log = TransitionLog::new();
        assert!(log.records().is_empty());
        assert!(log.get_path().is_empty());
        assert!(log.duration().is_none());
    }

    #[test]
    fn record_is_immutable() {
        let log = TransitionLog::new();
        let next = log.record(record("off", "on"));

        assert_eq!(log.records().len(), 0);
        assert_eq!(next.records().len(), 1);
    }

    #[test]
    fn get_path_returns_value_sequence() {
        let log = TransitionLog::new()
            .record(record("off", "on"))
            .record(record("on", "off"));

        let path = log.get_path();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], &StateValue::leaf("off"));
        assert_eq!(path[1], &StateValue::leaf("on"));
        assert_eq!(path[2], &StateValue::leaf("off"));
    }

    #[test]
    fn capacity_drops_oldest_records() {
        let log = TransitionLog::with_capacity(2)
            .record(record("a", "b"))
            .record(record("b", "c"))
            .record(record("c", "d"));

        let targets: Vec<_> = log.records().iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["c", "d"]);
    }

    #[test]
    fn single_record_has_zero_duration() {
        let log = TransitionLog::new().record(record("off", "on"));
        assert_eq!(log.duration(), Some(Duration::from_secs(0)));
    }

    #[test]
    fn history_mode_uses_lowercase_names() {
        let mode: HistoryMode = serde_json::from_str(r#""deep""#).unwrap();
        assert_eq!(mode, HistoryMode::Deep);
        assert_eq!(HistoryMode::default(), HistoryMode::None);
    }
}
