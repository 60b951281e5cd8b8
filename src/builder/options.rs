//! Machine-wide options.

use serde::{Deserialize, Serialize};

/// How a sequential state picks its default child when several are flagged
/// `initial`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialPolicy {
    /// Reject the configuration at build time.
    #[default]
    Reject,
    /// Accept it, log a warning and use the first flagged child.
    FirstMatch,
}

/// Options applied when building a machine.
///
/// Deserializable so hosts can keep them next to the rest of their
/// configuration; missing fields take their defaults.
///
/// ```rust
/// use canopy::builder::{InitialPolicy, MachineOptions};
///
/// let options: MachineOptions =
///     serde_json::from_str(r#"{"initial_policy":"first_match"}"#).unwrap();
/// assert_eq!(options.initial_policy, InitialPolicy::FirstMatch);
/// assert_eq!(options.journal_capacity, MachineOptions::default().journal_capacity);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineOptions {
    pub initial_policy: InitialPolicy,
    /// Maximum transition records kept; `None` keeps all of them.
    pub journal_capacity: Option<usize>,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self {
            initial_policy: InitialPolicy::Reject,
            journal_capacity: Some(256),
        }
    }
}

impl MachineOptions {
    pub fn initial_policy(mut self, policy: InitialPolicy) -> Self {
        self.initial_policy = policy;
        self
    }

    pub fn journal_capacity(mut self, capacity: Option<usize>) -> Self {
        self.journal_capacity = capacity;
        self
    }
}
