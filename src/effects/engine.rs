//! The state-tree engine.
//!
//! All tree mutation happens here, behind the machine's single-flight lock.
//! Every user callback is run to completion before its result is acted on,
//! and follow-up transitions requested by handlers go through one queue per
//! machine so two transitions never interleave their exit and enter phases.

use crate::builder::{check_tree, InitialPolicy, StateConfig};
use crate::core::{ContextValue, Event, HistoryMode, StateValue, TransitionLog, TransitionRecord};
use crate::effects::error::{MachineError, Phase};
use crate::effects::machine::Shared;
use crate::effects::params::{
    ContextParams, EntryParams, EventParams, PendingTimer, Reaction, TimerAction,
};
use crate::effects::subscription::Subscribers;
use crate::effects::tree::{NodeId, Tree};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Weak;
use stillwater::effect::Effect;

/// Upper bound on transitions chained from a single start, send or timer.
pub const MAX_CHAINED_TRANSITIONS: usize = 1024;

struct Request {
    source: NodeId,
    epoch: u64,
    target: String,
}

pub(crate) struct Engine<C, E> {
    pub(crate) tree: Tree<C, E>,
    running: bool,
    policy: InitialPolicy,
    queue: VecDeque<Request>,
    pub(crate) journal: TransitionLog,
    subscribers: Subscribers<C>,
    shared: Weak<Shared<C, E>>,
}

impl<C: ContextValue, E: Event> Engine<C, E> {
    pub(crate) fn new(
        tree: Tree<C, E>,
        policy: InitialPolicy,
        journal: TransitionLog,
        subscribers: Subscribers<C>,
        shared: Weak<Shared<C, E>>,
    ) -> Self {
        Self {
            tree,
            running: false,
            policy,
            queue: VecDeque::new(),
            journal,
            subscribers,
            shared,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running
    }

    pub(crate) fn value(&self) -> StateValue {
        self.tree.value_of(self.tree.root())
    }

    pub(crate) fn node(&self, id: &str) -> Result<NodeId, MachineError> {
        self.tree
            .lookup(id)
            .ok_or_else(|| MachineError::UnknownState { id: id.to_string() })
    }

    pub(crate) fn is_active(&self, id: &str) -> bool {
        self.tree.lookup(id).is_some_and(|n| self.tree[n].active)
    }

    /// Ids of every active state, parents before children.
    pub(crate) fn active_states(&self) -> Vec<String> {
        self.tree
            .active_pre_order(self.tree.root())
            .into_iter()
            .map(|n| self.tree[n].id.clone())
            .collect()
    }

    pub(crate) fn pending_timers(&self) -> usize {
        self.tree
            .active_pre_order(self.tree.root())
            .into_iter()
            .map(|n| self.tree[n].timers.pending())
            .sum()
    }

    pub(crate) fn restore_journal(&mut self, journal: TransitionLog) {
        self.journal = journal;
    }

    /// Enter the whole tree, either by default descent or from `resume`.
    ///
    /// No-op while already running. A snapshot that does not fit the tree is
    /// rejected before any state is entered; any later failure exits what
    /// was entered and leaves the machine stopped.
    pub(crate) async fn start(&mut self, resume: Option<StateValue>) -> Result<(), MachineError> {
        if self.running {
            tracing::debug!("start ignored, machine already running");
            return Ok(());
        }
        if let Some(value) = &resume {
            self.check_snapshot(value)?;
        }
        self.running = true;
        let root = self.tree.root();
        let entered = match self.enter_subtree(root, resume).await {
            Ok(()) => self.drain().await,
            Err(error) => Err(error),
        };
        if let Err(error) = entered {
            tracing::error!(%error, "start failed, exiting entered states");
            if let Err(cleanup) = self.stop().await {
                tracing::error!(error = %cleanup, "exit after failed start failed");
            }
            return Err(error);
        }
        tracing::info!(state = %self.value(), "machine started");
        self.notify();
        Ok(())
    }

    /// Exit the whole tree, cancelling every timer and forgetting history.
    pub(crate) async fn stop(&mut self) -> Result<(), MachineError> {
        if !self.running {
            return Ok(());
        }
        self.queue.clear();
        let root = self.tree.root();
        let result = self.exit_subtree(root).await;
        self.tree.forget_history();
        self.running = false;
        tracing::info!("machine stopped");
        result
    }

    /// Resolve a snapshot against the tree without entering anything.
    pub(crate) fn check_snapshot(&self, value: &StateValue) -> Result<(), MachineError> {
        let mut stack = vec![(self.tree.root(), value.clone())];
        while let Some((id, value)) = stack.pop() {
            for (child, resume) in self.child_plan(id, Some(value))? {
                if let Some(resume) = resume {
                    stack.push((child, resume));
                }
            }
        }
        Ok(())
    }

    /// Broadcast `event` to every active node of the subtree at `start`.
    ///
    /// Handlers run on the configuration as it was when the event arrived,
    /// parents before children; the transitions they request run afterwards
    /// in the same order.
    pub(crate) async fn dispatch(&mut self, start: NodeId, event: E) -> Result<(), MachineError> {
        if !self.running {
            return Err(MachineError::NotRunning);
        }
        if !self.tree[start].active {
            tracing::warn!(
                state = %self.tree[start].id,
                event = event.kind(),
                "event sent to inactive state ignored"
            );
            return Ok(());
        }

        for id in self.tree.active_pre_order(start) {
            let node = &self.tree[id];
            let Some(handler) = node.handlers.get(event.kind()).cloned() else {
                continue;
            };
            let params = EventParams::new(node.context.clone(), event.clone());
            let epoch = node.epoch;
            tracing::debug!(state = %node.id, event = event.kind(), "handling event");

            let reaction = handler().run(&params).await.map_err(|source| {
                self.queue.clear();
                MachineError::Handler {
                    event: event.kind().to_string(),
                    state: self.tree[id].id.clone(),
                    source,
                }
            })?;
            if let Reaction::Goto(target) = reaction {
                self.queue.push_back(Request {
                    source: id,
                    epoch,
                    target,
                });
            }
        }

        self.drain().await
    }

    /// Run a fired delayed callback if its node is still in the same activation.
    pub(crate) async fn fire_timer(
        &mut self,
        id: NodeId,
        epoch: u64,
        callback: TimerAction<C>,
    ) -> Result<(), MachineError> {
        let node = &self.tree[id];
        if !self.running || !node.active || node.epoch != epoch {
            tracing::debug!(state = %node.id, "stale timer dropped");
            return Ok(());
        }
        let params = ContextParams::new(node.context.clone());
        let reaction = callback()
            .run(&params)
            .await
            .map_err(|source| MachineError::Action {
                state: self.tree[id].id.clone(),
                phase: Phase::Timer,
                source,
            })?;
        if let Reaction::Goto(target) = reaction {
            self.queue.push_back(Request {
                source: id,
                epoch,
                target,
            });
        }
        self.drain().await
    }

    /// Attach a subtree at runtime.
    pub(crate) async fn append(
        &mut self,
        parent: &str,
        config: StateConfig<C, E>,
    ) -> Result<(), MachineError> {
        let parent = self.tree.lookup(parent).ok_or_else(|| {
            crate::builder::BuildError::UnknownParent {
                id: parent.to_string(),
            }
        })?;
        check_tree(&config, &self.tree.ids(), self.policy, false)?;

        let child = self.tree.attach(parent, config);
        tracing::debug!(
            state = %self.tree[child].id,
            parent = %self.tree[parent].id,
            "state appended"
        );

        let node = &self.tree[parent];
        if self.running && node.active && (node.parallel || node.current.is_none()) {
            self.enter_subtree(child, None).await?;
            self.drain().await?;
            self.notify();
        }
        Ok(())
    }

    async fn drain(&mut self) -> Result<(), MachineError> {
        let mut steps = 0;
        while let Some(request) = self.queue.pop_front() {
            let source = &self.tree[request.source];
            if !source.active || source.epoch != request.epoch {
                tracing::debug!(
                    state = %source.id,
                    target = %request.target,
                    "transition from exited state dropped"
                );
                continue;
            }
            steps += 1;
            if steps > MAX_CHAINED_TRANSITIONS {
                self.queue.clear();
                return Err(MachineError::TransitionLimit {
                    limit: MAX_CHAINED_TRANSITIONS,
                });
            }
            if let Err(error) = self.transition(request.source, &request.target).await {
                self.queue.clear();
                return Err(error);
            }
        }
        Ok(())
    }

    async fn transition(&mut self, source: NodeId, target_id: &str) -> Result<(), MachineError> {
        let target = self
            .tree
            .lookup(target_id)
            .ok_or_else(|| MachineError::TargetNotFound {
                target: target_id.to_string(),
            })?;
        let before = self.value();
        tracing::info!(
            source = %self.tree[source].id,
            target = target_id,
            "transition started"
        );

        match self.boundary(source, target) {
            None => {
                let root = self.tree.root();
                self.exit_subtree(root).await?;
                self.enter_subtree(root, None).await?;
            }
            Some(boundary) => {
                let path = self.tree.path_from(boundary, target);
                let outgoing = if self.tree[boundary].parallel {
                    Some(path[0])
                } else {
                    self.tree[boundary].current
                };
                if let Some(outgoing) = outgoing.filter(|&n| self.tree[n].active) {
                    self.exit_subtree(outgoing).await?;
                }
                self.enter_path(&path).await?;
            }
        }

        self.settle(target, before);
        Ok(())
    }

    /// Deepest proper ancestor of `target` that is `source` or contains it.
    ///
    /// `None` when the target is the root.
    fn boundary(&self, source: NodeId, target: NodeId) -> Option<NodeId> {
        let mut cursor = self.tree[target].parent;
        while let Some(candidate) = cursor {
            if self.tree.contains(candidate, source) {
                return Some(candidate);
            }
            cursor = self.tree[candidate].parent;
        }
        None
    }

    /// Enter the explicit path toward a target, then the target itself.
    ///
    /// Nodes on the path skip default-initial selection; sibling regions of
    /// parallel nodes on the path are entered by default descent.
    async fn enter_path(&mut self, path: &[NodeId]) -> Result<(), MachineError> {
        let Some((&target, along)) = path.split_last() else {
            return Ok(());
        };
        for (i, &id) in along.iter().enumerate() {
            self.activate(id).await?;
            if self.tree[id].parallel {
                let next = path[i + 1];
                let regions: Vec<NodeId> = self.tree[id]
                    .children
                    .iter()
                    .copied()
                    .filter(|&c| c != next)
                    .collect();
                for region in regions {
                    self.enter_subtree(region, None).await?;
                }
            }
        }
        self.enter_subtree(target, None).await
    }

    /// Enter `start` and descend into its children, parents first.
    async fn enter_subtree(
        &mut self,
        start: NodeId,
        resume: Option<StateValue>,
    ) -> Result<(), MachineError> {
        let mut stack = vec![(start, resume)];
        while let Some((id, resume)) = stack.pop() {
            self.activate(id).await?;
            let plan = self.child_plan(id, resume)?;
            stack.extend(plan.into_iter().rev());
        }
        Ok(())
    }

    /// Children to enter below a freshly activated node.
    fn child_plan(
        &self,
        id: NodeId,
        resume: Option<StateValue>,
    ) -> Result<Vec<(NodeId, Option<StateValue>)>, MachineError> {
        let node = &self.tree[id];
        let snapshot_error = |reason: String| MachineError::Snapshot {
            state: node.id.clone(),
            reason,
        };
        let resume = resume.filter(|value| *value != StateValue::Leaf(node.id.clone()));

        if node.is_leaf() {
            return match resume {
                Some(StateValue::Leaf(child)) => Err(snapshot_error(format!(
                    "state has no children, snapshot names '{child}'"
                ))),
                Some(StateValue::Branch(children)) if !children.is_empty() => Err(
                    snapshot_error("state has no children, snapshot has nested states".into()),
                ),
                _ => Ok(Vec::new()),
            };
        }

        let resume = resume.or_else(|| self.remembered(id));

        match resume {
            Some(StateValue::Leaf(name)) => {
                let target = self
                    .tree
                    .lookup(&name)
                    .ok_or_else(|| MachineError::TargetNotFound {
                        target: name.clone(),
                    })?;
                if !self.tree.contains(id, target) {
                    return Err(snapshot_error(format!("'{name}' is not below this state")));
                }
                // Explicit target: descend along its path, default descent elsewhere.
                let next = self.tree.path_from(id, target)[0];
                let next_resume = (next != target).then(|| StateValue::Leaf(name));
                if node.parallel {
                    Ok(node
                        .children
                        .iter()
                        .map(|&c| (c, if c == next { next_resume.clone() } else { None }))
                        .collect())
                } else {
                    Ok(vec![(next, next_resume)])
                }
            }
            Some(StateValue::Branch(mut children)) if node.parallel => Ok(node
                .children
                .iter()
                .map(|&c| (c, children.remove(&self.tree[c].id)))
                .collect()),
            Some(StateValue::Branch(children)) if !children.is_empty() => {
                if children.len() > 1 {
                    return Err(snapshot_error(
                        "sequential state cannot resume several children".into(),
                    ));
                }
                let (name, value) = children
                    .into_iter()
                    .next()
                    .ok_or_else(|| snapshot_error("empty snapshot".into()))?;
                let c = self
                    .tree
                    .child_named(id, &name)
                    .ok_or_else(|| snapshot_error(format!("no child named '{name}'")))?;
                Ok(vec![(c, Some(value))])
            }
            _ if node.parallel => Ok(node.children.iter().map(|&c| (c, None)).collect()),
            _ => Ok(vec![(self.default_child(id), None)]),
        }
    }

    /// Remembered value to restore on re-entry, shaped by the node's history mode.
    fn remembered(&self, id: NodeId) -> Option<StateValue> {
        let node = &self.tree[id];
        let remembered = node.remembered.as_ref()?;
        match node.history {
            HistoryMode::None => None,
            HistoryMode::Deep => Some(remembered.clone()),
            HistoryMode::Shallow if node.parallel => None,
            HistoryMode::Shallow => match remembered {
                StateValue::Leaf(child) => Some(StateValue::Leaf(child.clone())),
                StateValue::Branch(children) => children
                    .keys()
                    .next()
                    .map(|child| StateValue::Leaf(child.clone())),
            },
        }
    }

    /// First child flagged `initial`, else the first declared child.
    fn default_child(&self, id: NodeId) -> NodeId {
        let node = &self.tree[id];
        let flagged: Vec<NodeId> = node
            .children
            .iter()
            .copied()
            .filter(|&c| self.tree[c].initial)
            .collect();
        if flagged.len() > 1 {
            tracing::warn!(
                state = %node.id,
                chosen = %self.tree[flagged[0]].id,
                "several initial children flagged, using the first"
            );
        }
        flagged.first().copied().unwrap_or(node.children[0])
    }

    /// Mark a node active and run its entry action.
    async fn activate(&mut self, id: NodeId) -> Result<(), MachineError> {
        let node = &mut self.tree[id];
        node.timers.clear();
        node.active = true;
        node.current = None;
        node.epoch += 1;
        let epoch = node.epoch;
        let action = node.on_entry.clone();
        let context = node.context.clone();
        let parent = node.parent;
        tracing::debug!(state = %node.id, "entering state");

        if let Some(parent) = parent.filter(|&p| !self.tree[p].parallel) {
            self.tree[parent].current = Some(id);
        }

        let Some(action) = action else {
            return Ok(());
        };
        let params = EntryParams::new(context);
        let reaction = action()
            .run(&params)
            .await
            .map_err(|source| MachineError::Action {
                state: self.tree[id].id.clone(),
                phase: Phase::Entry,
                source,
            })?;

        for timer in params.take_timers() {
            self.arm_timer(id, epoch, timer);
        }
        if let Reaction::Goto(target) = reaction {
            self.queue.push_back(Request {
                source: id,
                epoch,
                target,
            });
        }
        Ok(())
    }

    /// Exit the active subtree at `start`, innermost first.
    async fn exit_subtree(&mut self, start: NodeId) -> Result<(), MachineError> {
        let order = self.tree.active_post_order(start);

        for &id in &order {
            if self.tree[id].history != HistoryMode::None && !self.tree[id].is_leaf() {
                let value = self.tree.value_of(id);
                self.tree[id].remembered = Some(value);
            }
        }

        for id in order {
            let node = &mut self.tree[id];
            node.timers.clear();
            node.active = false;
            node.epoch += 1;
            let action = node.on_exit.clone();
            let context = node.context.clone();
            tracing::debug!(state = %node.id, "exiting state");

            if let Some(action) = action {
                let params = ContextParams::new(context);
                action()
                    .run(&params)
                    .await
                    .map_err(|source| MachineError::Action {
                        state: self.tree[id].id.clone(),
                        phase: Phase::Exit,
                        source,
                    })?;
            }
        }

        if let Some(parent) = self.tree[start].parent {
            if self.tree[parent].current == Some(start) {
                self.tree[parent].current = None;
            }
        }
        Ok(())
    }

    fn arm_timer(&mut self, id: NodeId, epoch: u64, timer: PendingTimer<C>) {
        let shared = self.shared.clone();
        let PendingTimer { delay, callback } = timer;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Fired from a detached task: the transition it starts may exit
            // this node and abort the sleeping task.
            tokio::spawn(async move {
                let Some(shared) = shared.upgrade() else {
                    return;
                };
                let mut engine = shared.engine.lock().await;
                if let Err(error) = engine.fire_timer(id, epoch, callback).await {
                    tracing::error!(%error, "delayed transition failed");
                }
            });
        });
        tracing::debug!(state = %self.tree[id].id, ?delay, "timer armed");
        self.tree[id].timers.push(handle);
    }

    /// Record the transition and run ancestor hooks and subscribers.
    fn settle(&mut self, target: NodeId, before: StateValue) {
        let after = self.value();
        self.journal = self.journal.record(TransitionRecord {
            from: before,
            to: after.clone(),
            target: self.tree[target].id.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(state = %after, "transition settled");

        let mut cursor = self.tree[target].parent;
        while let Some(id) = cursor {
            let node = &self.tree[id];
            if let Some(hook) = &node.on_transition {
                hook(&self.tree.value_of(id), &*node.context.get());
            }
            cursor = node.parent;
        }
        self.notify();
    }

    fn notify(&self) {
        let root = self.tree.root();
        self.subscribers
            .notify(&self.value(), &self.tree[root].context.get());
    }
}
