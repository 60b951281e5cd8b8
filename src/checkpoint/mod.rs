//! Checkpoint and resume functionality for machines.
//!
//! A checkpoint pairs the serialized state value with the root context and
//! the transition journal, so a machine can be rebuilt from the same
//! configuration and resumed where it left off after a process restart.
//! Handlers are code and are never part of a checkpoint.

use crate::core::{ContextValue, StateValue, TransitionLog};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;

pub use error::CheckpointError;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable snapshot of a running machine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "C: ContextValue")]
pub struct Checkpoint<C> {
    /// Checkpoint format version
    pub version: u32,

    /// Unique checkpoint identifier
    pub id: String,

    /// When checkpoint was created
    pub timestamp: DateTime<Utc>,

    /// Active configuration at capture time
    pub state: StateValue,

    /// Root context at capture time
    pub context: C,

    /// Transitions recorded up to capture time
    pub journal: TransitionLog,
}

impl<C: ContextValue> Checkpoint<C> {
    pub fn new(state: StateValue, context: C, journal: TransitionLog) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            state,
            context,
            journal,
        }
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Self = serde_json::from_str(json)?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, CheckpointError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: Self = bincode::deserialize(bytes)?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    /// Check the format version and basic shape.
    pub fn validate(&self) -> Result<(), CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        if self.id.is_empty() {
            return Err(CheckpointError::Invalid("checkpoint id is empty".to_string()));
        }
        if let StateValue::Leaf(id) = &self.state {
            if id.is_empty() {
                return Err(CheckpointError::Invalid(
                    "state value names an empty state".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransitionRecord;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Ctx {
        count: u32,
        label: String,
    }

    fn sample() -> Checkpoint<Ctx> {
        let journal = TransitionLog::new().record(TransitionRecord {
            from: StateValue::leaf("off"),
            to: StateValue::leaf("on"),
            target: "on".into(),
            timestamp: Utc::now(),
        });
        Checkpoint::new(
            StateValue::branch([("running", StateValue::leaf("fast"))]),
            Ctx {
                count: 3,
                label: "x".into(),
            },
            journal,
        )
    }

    #[test]
    fn json_keeps_state_context_and_journal() {
        let checkpoint = sample();
        let json = checkpoint.to_json().unwrap();
        assert!(json.contains("\"running\""));

        let restored: Checkpoint<Ctx> = Checkpoint::from_json(&json).unwrap();
        assert_eq!(restored.id, checkpoint.id);
        assert_eq!(restored.state, checkpoint.state);
        assert_eq!(restored.context, checkpoint.context);
        assert_eq!(restored.journal.records().len(), 1);
    }

    #[test]
    fn binary_restores_nested_state() {
        let checkpoint = sample();
        let bytes = checkpoint.to_binary().unwrap();
        let restored: Checkpoint<Ctx> = Checkpoint::from_binary(&bytes).unwrap();
        assert_eq!(restored.state, checkpoint.state);
        assert_eq!(restored.context.count, 3);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut checkpoint = sample();
        checkpoint.version = 99;
        let json = checkpoint.to_json().unwrap();

        match Checkpoint::<Ctx>::from_json(&json) {
            Err(CheckpointError::UnsupportedVersion { found, supported }) => {
                assert_eq!(found, 99);
                assert_eq!(supported, CHECKPOINT_VERSION);
            }
            other => panic!("expected version error, got {other:?}"),
        }
    }

    #[test]
    fn garbage_fails_to_deserialize() {
        assert!(matches!(
            Checkpoint::<Ctx>::from_json("{not json"),
            Err(CheckpointError::Json(_))
        ));
        assert!(matches!(
            Checkpoint::<Ctx>::from_binary(&[1, 2, 3]),
            Err(CheckpointError::Binary(_))
        ));
    }

    #[test]
    fn empty_leaf_fails_validation() {
        let mut checkpoint = sample();
        checkpoint.state = StateValue::leaf("");
        assert!(matches!(
            checkpoint.validate(),
            Err(CheckpointError::Invalid(_))
        ));
    }
}
