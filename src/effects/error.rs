//! Runtime errors raised by a running machine.

use crate::builder::BuildError;
use crate::checkpoint::CheckpointError;
use crate::effects::params::HandlerError;
use std::fmt;
use thiserror::Error;

/// Which lifecycle callback failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Entry,
    Exit,
    Timer,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Entry => "Entry",
            Self::Exit => "Exit",
            Self::Timer => "Delayed",
        })
    }
}

/// Errors surfaced by machine operations.
///
/// A failure aborts the in-flight transition where it happened: states
/// already exited stay exited and states not yet entered stay inactive.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("Machine is not running. Call start() before sending events")]
    NotRunning,

    #[error("Target state '{target}' not found")]
    TargetNotFound { target: String },

    #[error("State '{id}' not found")]
    UnknownState { id: String },

    #[error("Handler for event '{event}' in state '{state}' failed: {source}")]
    Handler {
        event: String,
        state: String,
        source: HandlerError,
    },

    #[error("{phase} action of state '{state}' failed: {source}")]
    Action {
        state: String,
        phase: Phase,
        source: HandlerError,
    },

    #[error("Snapshot does not fit state '{state}': {reason}")]
    Snapshot { state: String, reason: String },

    #[error("More than {limit} chained transitions without settling")]
    TransitionLimit { limit: usize },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}
