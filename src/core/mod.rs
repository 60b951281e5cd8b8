//! Core building blocks of the state tree.
//!
//! This module holds the pieces the engine is assembled from:
//! - Events via the `Event` trait
//! - The shared context store
//! - The serialized state value
//! - History policy and the transition journal
//! - Per-node timer bookkeeping
//!
//! Nothing in here knows about tree traversal or handler execution.

mod context;
mod event;
mod history;
mod timer;
mod value;

pub use context::{ContextCell, ContextError, ContextValue};
pub use event::{DynEvent, Event};
pub use history::{HistoryMode, TransitionLog, TransitionRecord};
pub use timer::TimerRegistry;
pub use value::StateValue;
