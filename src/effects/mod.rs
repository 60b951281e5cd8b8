//! The imperative shell around the pure core.
//!
//! This module runs the state tree: it enters and exits nodes, dispatches
//! events, resolves transitions and fires delayed callbacks.
//!
//! # Key Concepts
//!
//! - **Handlers**: entry, exit, event and delayed callbacks are Stillwater
//!   effects produced by a factory on every invocation
//! - **Reactions**: a handler's result; `Goto` requests a transition that runs
//!   only after the handler has completed
//! - **Machine**: the façade owning the tree, the subscriber list and the
//!   single-flight transition queue
//!
//! Following Stillwater 0.11.0 conventions, collections store `BoxedEffect`
//! and handlers are built with the free-standing constructors `pure()`,
//! `fail()` and `from_fn()`.

mod engine;
mod error;
mod machine;
mod params;
mod subscription;
mod tree;

pub use engine::MAX_CHAINED_TRANSITIONS;
pub use error::{MachineError, Phase};
pub use machine::Machine;
pub use params::{
    ContextParams, EntryAction, EntryParams, EventAction, EventParams, ExitAction, HandlerError,
    Reaction, TimerAction, TransitionHook,
};
pub use subscription::{Listener, Subscription};

pub(crate) use tree::Tree;
