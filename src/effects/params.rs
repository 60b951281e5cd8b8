//! Handler capability bundles and action types.
//!
//! Every user callback is a factory producing a fresh Stillwater effect per
//! invocation. The effect's environment is the capability bundle for that
//! kind of callback, so handlers read and write context through it.

use crate::core::{ContextCell, ContextError, ContextValue, Event};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use stillwater::effect::BoxedEffect;
use stillwater::prelude::*;

/// What a handler asks the engine to do once it has settled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reaction {
    /// No transition
    Stay,
    /// Transition to the state with this id
    Goto(String),
}

impl Reaction {
    pub fn goto(target: impl Into<String>) -> Self {
        Self::Goto(target.into())
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Stay => None,
            Self::Goto(target) => Some(target),
        }
    }
}

impl From<Option<String>> for Reaction {
    fn from(target: Option<String>) -> Self {
        target.map_or(Self::Stay, Self::Goto)
    }
}

/// Errors returned by user handlers.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Context(#[from] ContextError),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Entry action factory.
pub type EntryAction<C> =
    Arc<dyn Fn() -> BoxedEffect<Reaction, HandlerError, EntryParams<C>> + Send + Sync>;

/// Exit action factory.
pub type ExitAction<C> =
    Arc<dyn Fn() -> BoxedEffect<(), HandlerError, ContextParams<C>> + Send + Sync>;

/// Event handler factory.
pub type EventAction<C, E> =
    Arc<dyn Fn() -> BoxedEffect<Reaction, HandlerError, EventParams<C, E>> + Send + Sync>;

/// Delayed callback factory.
pub type TimerAction<C> =
    Arc<dyn Fn() -> BoxedEffect<Reaction, HandlerError, ContextParams<C>> + Send + Sync>;

/// Hook run on an ancestor after a transition among its descendants settles.
pub type TransitionHook<C> = Arc<dyn Fn(&crate::core::StateValue, &C) + Send + Sync>;

/// Context capabilities shared by every handler.
pub struct ContextParams<C> {
    pub(crate) cell: ContextCell<C>,
}

impl<C> Clone for ContextParams<C> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<C: ContextValue> ContextParams<C> {
    pub(crate) fn new(cell: ContextCell<C>) -> Self {
        Self { cell }
    }

    /// Current context value.
    pub fn context(&self) -> Arc<C> {
        self.cell.get()
    }

    /// Point update of a single named field.
    pub fn set_context<V: Serialize>(&self, key: &str, value: V) -> Result<(), ContextError> {
        self.cell.set(key, value)
    }

    /// Functional replace of the whole value.
    pub fn update_context<F>(&self, f: F)
    where
        F: FnOnce(&C) -> C,
    {
        self.cell.update(f)
    }

    /// Shallow merge of a JSON object into the value.
    pub fn merge_context(&self, partial: serde_json::Value) -> Result<(), ContextError> {
        self.cell.merge(partial)
    }
}

/// Timer requested during entry, armed once entry settles.
pub(crate) struct PendingTimer<C> {
    pub(crate) delay: Duration,
    pub(crate) callback: TimerAction<C>,
}

/// Capabilities passed to entry actions.
pub struct EntryParams<C> {
    base: ContextParams<C>,
    timers: Arc<Mutex<Vec<PendingTimer<C>>>>,
}

impl<C> Clone for EntryParams<C> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            timers: Arc::clone(&self.timers),
        }
    }
}

impl<C: ContextValue> EntryParams<C> {
    pub(crate) fn new(cell: ContextCell<C>) -> Self {
        Self {
            base: ContextParams::new(cell),
            timers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Schedule `callback` on the entering node.
    ///
    /// The timer is owned by the node and cancelled when the node exits.
    pub fn after<F>(&self, delay: Duration, callback: F)
    where
        F: Fn() -> BoxedEffect<Reaction, HandlerError, ContextParams<C>> + Send + Sync + 'static,
    {
        self.timers.lock().push(PendingTimer {
            delay,
            callback: Arc::new(callback),
        });
    }

    /// Schedule a plain transition to `target`.
    pub fn after_goto(&self, delay: Duration, target: impl Into<String>) {
        let target = target.into();
        self.after(delay, move || pure(Reaction::Goto(target.clone())).boxed());
    }

    pub(crate) fn take_timers(&self) -> Vec<PendingTimer<C>> {
        std::mem::take(&mut *self.timers.lock())
    }
}

impl<C> std::ops::Deref for EntryParams<C> {
    type Target = ContextParams<C>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// Capabilities passed to event handlers.
pub struct EventParams<C, E> {
    base: ContextParams<C>,
    event: E,
}

impl<C, E: Clone> Clone for EventParams<C, E> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            event: self.event.clone(),
        }
    }
}

impl<C: ContextValue, E: Event> EventParams<C, E> {
    pub(crate) fn new(cell: ContextCell<C>, event: E) -> Self {
        Self {
            base: ContextParams::new(cell),
            event,
        }
    }

    /// The event being dispatched.
    pub fn event(&self) -> &E {
        &self.event
    }
}

impl<C, E> std::ops::Deref for EventParams<C, E> {
    type Target = ContextParams<C>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}
