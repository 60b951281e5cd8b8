//! Root façade over the state-tree engine.

use crate::builder::{BuildError, MachineBuilder, MachineOptions, StateConfig};
use crate::checkpoint::Checkpoint;
use crate::core::{ContextCell, ContextValue, Event, StateValue, TransitionLog};
use crate::effects::engine::Engine;
use crate::effects::error::MachineError;
use crate::effects::subscription::{Subscribers, Subscription};
use crate::effects::tree::Tree;
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) struct Shared<C, E> {
    pub(crate) engine: Mutex<Engine<C, E>>,
    subscribers: Subscribers<C>,
    context: ContextCell<C>,
}

/// A running hierarchical state machine.
///
/// Cloning yields another handle to the same machine. Operations are
/// serialized: an event sent while another operation is settling waits for
/// it to finish.
///
/// Handlers must not call back into the machine that runs them; return a
/// [`Reaction`](crate::effects::Reaction) instead.
///
/// # Example
///
/// ```rust
/// use canopy::builder::StateConfig;
/// use canopy::core::{DynEvent, StateValue};
/// use canopy::effects::Machine;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let light = Machine::new(
///     StateConfig::<(), DynEvent>::new("light")
///         .context(())
///         .state(StateConfig::new("off").on_goto("TOGGLE", "on"))
///         .state(StateConfig::new("on").on_goto("TOGGLE", "off")),
/// )
/// .unwrap();
///
/// light.start().await.unwrap();
/// light.send("TOGGLE".into()).await.unwrap();
/// assert_eq!(light.state().await, StateValue::leaf("on"));
/// # }
/// ```
pub struct Machine<C, E> {
    shared: Arc<Shared<C, E>>,
}

impl<C, E> Clone for Machine<C, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: ContextValue, E: Event> Machine<C, E> {
    /// Build a machine with default options.
    pub fn new(root: StateConfig<C, E>) -> Result<Self, BuildError> {
        MachineBuilder::new(root).build()
    }

    pub(crate) fn assemble(
        tree: Tree<C, E>,
        context: ContextCell<C>,
        options: &MachineOptions,
    ) -> Self {
        let journal = match options.journal_capacity {
            Some(capacity) => TransitionLog::with_capacity(capacity),
            None => TransitionLog::new(),
        };
        let subscribers = Subscribers::default();
        let shared = Arc::new_cyclic(|weak| Shared {
            engine: Mutex::new(Engine::new(
                tree,
                options.initial_policy,
                journal,
                subscribers.clone(),
                weak.clone(),
            )),
            subscribers,
            context,
        });
        Self { shared }
    }

    /// Enter the tree by default descent. No-op while running.
    pub async fn start(&self) -> Result<(), MachineError> {
        self.shared.engine.lock().await.start(None).await
    }

    /// Enter the tree following a previously serialized state value.
    ///
    /// A bare leaf id is entered like an explicit transition target. No-op
    /// while running.
    pub async fn start_from(&self, value: StateValue) -> Result<(), MachineError> {
        self.shared.engine.lock().await.start(Some(value)).await
    }

    /// Exit every active state and cancel every timer.
    pub async fn stop(&self) -> Result<(), MachineError> {
        self.shared.engine.lock().await.stop().await
    }

    /// Broadcast an event to every active state.
    pub async fn send(&self, event: E) -> Result<(), MachineError> {
        let mut engine = self.shared.engine.lock().await;
        let root = engine.tree.root();
        engine.dispatch(root, event).await
    }

    /// Alias of [`Machine::send`].
    pub async fn dispatch(&self, event: E) -> Result<(), MachineError> {
        self.send(event).await
    }

    /// Dispatch an event to the subtree rooted at `state` only.
    ///
    /// Ignored with a warning if that state is not active.
    pub async fn send_to(&self, state: &str, event: E) -> Result<(), MachineError> {
        let mut engine = self.shared.engine.lock().await;
        let node = engine.node(state)?;
        engine.dispatch(node, event).await
    }

    /// Serialized active configuration.
    pub async fn state(&self) -> StateValue {
        self.shared.engine.lock().await.value()
    }

    /// Alias of [`Machine::state`].
    pub async fn value(&self) -> StateValue {
        self.state().await
    }

    /// Current root context.
    pub fn context(&self) -> Arc<C> {
        self.shared.context.get()
    }

    /// Observe every settled transition with the state value and root context.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<C>
    where
        F: Fn(&StateValue, &Arc<C>) + Send + Sync + 'static,
    {
        self.shared.subscribers.add(Arc::new(listener))
    }

    pub async fn is_running(&self) -> bool {
        self.shared.engine.lock().await.is_running()
    }

    pub async fn is_active(&self, state: &str) -> bool {
        self.shared.engine.lock().await.is_active(state)
    }

    /// Ids of every active state, parents before children.
    pub async fn active_states(&self) -> Vec<String> {
        self.shared.engine.lock().await.active_states()
    }

    /// Delayed callbacks scheduled by active states that have not fired yet.
    pub async fn pending_timers(&self) -> usize {
        self.shared.engine.lock().await.pending_timers()
    }

    pub async fn journal(&self) -> TransitionLog {
        self.shared.engine.lock().await.journal.clone()
    }

    /// Capture the state value, root context and journal.
    pub async fn checkpoint(&self) -> Checkpoint<C> {
        let engine = self.shared.engine.lock().await;
        Checkpoint::new(
            engine.value(),
            (*self.shared.context.get()).clone(),
            engine.journal.clone(),
        )
    }

    /// Restart the machine from a checkpoint.
    ///
    /// A running machine is stopped first. The context and journal are
    /// replaced before any entry action runs.
    pub async fn resume(&self, checkpoint: Checkpoint<C>) -> Result<(), MachineError> {
        checkpoint.validate()?;
        let mut engine = self.shared.engine.lock().await;
        engine.check_snapshot(&checkpoint.state)?;
        engine.stop().await?;
        self.shared.context.replace(checkpoint.context);
        engine.restore_journal(checkpoint.journal);
        tracing::info!(checkpoint = %checkpoint.id, "resuming from checkpoint");
        engine.start(Some(checkpoint.state)).await
    }

    /// Attach `config` as a new child of `parent`.
    ///
    /// The child is entered at once when the parent is active and either
    /// parallel or without an active child.
    pub async fn append(
        &self,
        parent: &str,
        config: StateConfig<C, E>,
    ) -> Result<(), MachineError> {
        self.shared.engine.lock().await.append(parent, config).await
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }
}
