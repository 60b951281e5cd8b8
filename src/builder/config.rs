//! Declarative state configuration.

use crate::core::{ContextValue, Event, HistoryMode, StateValue};
use crate::effects::{
    ContextParams, EntryAction, EntryParams, EventAction, EventParams, ExitAction, HandlerError,
    Reaction, TransitionHook,
};
use std::collections::HashMap;
use std::sync::Arc;
use stillwater::effect::BoxedEffect;
use stillwater::prelude::*;

/// Declarative description of one state and its subtree.
///
/// Children keep their declaration order, which decides the default child
/// of a sequential state when none is flagged `initial`.
///
/// # Example
///
/// ```rust
/// use canopy::builder::StateConfig;
/// use canopy::core::DynEvent;
///
/// let root: StateConfig<(), DynEvent> = StateConfig::new("light")
///     .context(())
///     .state(StateConfig::new("off").on_goto("TOGGLE", "on"))
///     .state(StateConfig::new("on").on_goto("TOGGLE", "off"));
///
/// assert_eq!(root.children().len(), 2);
/// ```
pub struct StateConfig<C, E> {
    pub(crate) id: String,
    pub(crate) context: Option<C>,
    pub(crate) parallel: bool,
    pub(crate) initial: bool,
    pub(crate) history: HistoryMode,
    pub(crate) children: Vec<StateConfig<C, E>>,
    pub(crate) handlers: HashMap<String, EventAction<C, E>>,
    pub(crate) on_entry: Option<EntryAction<C>>,
    pub(crate) on_exit: Option<ExitAction<C>>,
    pub(crate) on_transition: Option<TransitionHook<C>>,
}

impl<C: ContextValue, E: Event> StateConfig<C, E> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context: None,
            parallel: false,
            initial: false,
            history: HistoryMode::None,
            children: Vec::new(),
            handlers: HashMap::new(),
            on_entry: None,
            on_exit: None,
            on_transition: None,
        }
    }

    /// Give this state its own context (required on the root).
    pub fn context(mut self, value: C) -> Self {
        self.context = Some(value);
        self
    }

    /// Make all children active together.
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Mark this state as its parent's default child.
    pub fn initial(mut self) -> Self {
        self.initial = true;
        self
    }

    pub fn history(mut self, mode: HistoryMode) -> Self {
        self.history = mode;
        self
    }

    /// Append a child state.
    pub fn state(mut self, child: StateConfig<C, E>) -> Self {
        self.children.push(child);
        self
    }

    /// Append several child states.
    pub fn states(mut self, children: impl IntoIterator<Item = StateConfig<C, E>>) -> Self {
        self.children.extend(children);
        self
    }

    /// Register an event handler for `kind`.
    pub fn on<F>(mut self, kind: impl Into<String>, handler: F) -> Self
    where
        F: Fn() -> BoxedEffect<Reaction, HandlerError, EventParams<C, E>> + Send + Sync + 'static,
    {
        self.handlers.insert(kind.into(), Arc::new(handler));
        self
    }

    /// Register a handler that always transitions to `target`.
    pub fn on_goto(self, kind: impl Into<String>, target: impl Into<String>) -> Self {
        let target = target.into();
        self.on(kind, move || pure(Reaction::Goto(target.clone())).boxed())
    }

    /// Register a synchronous event handler.
    pub fn on_fn<F>(self, kind: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&EventParams<C, E>) -> Result<Reaction, HandlerError> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.on(kind, move || {
            let handler = Arc::clone(&handler);
            from_fn(move |params: &EventParams<C, E>| (*handler)(params)).boxed()
        })
    }

    pub fn entry<F>(mut self, action: F) -> Self
    where
        F: Fn() -> BoxedEffect<Reaction, HandlerError, EntryParams<C>> + Send + Sync + 'static,
    {
        self.on_entry = Some(Arc::new(action));
        self
    }

    /// Register a synchronous entry action.
    pub fn entry_fn<F>(self, action: F) -> Self
    where
        F: Fn(&EntryParams<C>) -> Result<Reaction, HandlerError> + Send + Sync + 'static,
    {
        let action = Arc::new(action);
        self.entry(move || {
            let action = Arc::clone(&action);
            from_fn(move |params: &EntryParams<C>| (*action)(params)).boxed()
        })
    }

    pub fn exit<F>(mut self, action: F) -> Self
    where
        F: Fn() -> BoxedEffect<(), HandlerError, ContextParams<C>> + Send + Sync + 'static,
    {
        self.on_exit = Some(Arc::new(action));
        self
    }

    /// Register a synchronous exit action.
    pub fn exit_fn<F>(self, action: F) -> Self
    where
        F: Fn(&ContextParams<C>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let action = Arc::new(action);
        self.exit(move || {
            let action = Arc::clone(&action);
            from_fn(move |params: &ContextParams<C>| (*action)(params)).boxed()
        })
    }

    /// Observe settled transitions among this state's descendants.
    pub fn on_transition<F>(mut self, hook: F) -> Self
    where
        F: Fn(&StateValue, &C) + Send + Sync + 'static,
    {
        self.on_transition = Some(Arc::new(hook));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn children(&self) -> &[StateConfig<C, E>] {
        &self.children
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn is_initial(&self) -> bool {
        self.initial
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DynEvent;

    #[test]
    fn builder_keeps_declaration_order() {
        let config: StateConfig<(), DynEvent> = StateConfig::new("root")
            .context(())
            .state(StateConfig::new("b"))
            .state(StateConfig::new("a").initial());

        let ids: Vec<_> = config.children().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(config.children()[1].is_initial());
        assert!(config.has_context());
    }

    #[test]
    fn handlers_are_keyed_by_event_kind() {
        let config: StateConfig<(), DynEvent> = StateConfig::new("s")
            .on_goto("GO", "t")
            .on_fn("STAY", |_| Ok(Reaction::Stay));

        assert!(config.handlers.contains_key("GO"));
        assert!(config.handlers.contains_key("STAY"));
        assert!(!config.handlers.contains_key("OTHER"));
    }

    #[test]
    fn parallel_and_history_flags() {
        let config: StateConfig<(), DynEvent> = StateConfig::new("p")
            .parallel()
            .history(HistoryMode::Deep);

        assert!(config.is_parallel());
        assert_eq!(config.history, HistoryMode::Deep);
    }
}
