//! Node arena for a single machine.
//!
//! The tree owns every node; children are stored by index and each node
//! keeps its parent's index for upward walks only. Ids resolve through a
//! registry owned by the tree, never a process-wide table.

use crate::builder::StateConfig;
use crate::core::{ContextCell, ContextValue, Event, HistoryMode, StateValue, TimerRegistry};
use crate::effects::params::{EntryAction, EventAction, ExitAction, TransitionHook};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::{Index, IndexMut};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

pub(crate) struct Node<C, E> {
    pub(crate) id: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parallel: bool,
    pub(crate) initial: bool,
    pub(crate) history: HistoryMode,
    pub(crate) active: bool,
    /// Selected child of an active sequential node.
    pub(crate) current: Option<NodeId>,
    pub(crate) remembered: Option<StateValue>,
    pub(crate) context: ContextCell<C>,
    pub(crate) handlers: HashMap<String, EventAction<C, E>>,
    pub(crate) on_entry: Option<EntryAction<C>>,
    pub(crate) on_exit: Option<ExitAction<C>>,
    pub(crate) on_transition: Option<TransitionHook<C>>,
    pub(crate) timers: TimerRegistry,
    /// Bumped on every enter and exit; stale timers and queued requests
    /// compare against it.
    pub(crate) epoch: u64,
}

impl<C, E> Node<C, E> {
    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

pub(crate) struct Tree<C, E> {
    nodes: Vec<Node<C, E>>,
    registry: HashMap<String, NodeId>,
    root: NodeId,
}

impl<C, E> Index<NodeId> for Tree<C, E> {
    type Output = Node<C, E>;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.0]
    }
}

impl<C, E> IndexMut<NodeId> for Tree<C, E> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id.0]
    }
}

impl<C: ContextValue, E: Event> Tree<C, E> {
    /// Build a tree from a validated root configuration.
    ///
    /// The root must carry a context; validation guarantees it.
    pub(crate) fn build(root: StateConfig<C, E>, root_context: ContextCell<C>) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            registry: HashMap::new(),
            root: NodeId(0),
        };
        tree.root = tree.insert(root, None, root_context);
        tree
    }

    /// Attach a validated subtree under `parent`.
    pub(crate) fn attach(&mut self, parent: NodeId, config: StateConfig<C, E>) -> NodeId {
        let inherited = self[parent].context.clone();
        let child = self.insert(config, Some(parent), inherited);
        self[parent].children.push(child);
        child
    }

    fn insert(
        &mut self,
        mut config: StateConfig<C, E>,
        parent: Option<NodeId>,
        inherited: ContextCell<C>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        // The root's own context was already turned into `inherited`.
        let context = match (parent, config.context.take()) {
            (Some(_), Some(own)) => ContextCell::new(own),
            _ => inherited,
        };
        let children = std::mem::take(&mut config.children);

        self.registry.insert(config.id.clone(), id);
        self.nodes.push(Node {
            id: config.id,
            parent,
            children: Vec::with_capacity(children.len()),
            parallel: config.parallel,
            initial: config.initial,
            history: config.history,
            active: false,
            current: None,
            remembered: None,
            context: context.clone(),
            handlers: config.handlers,
            on_entry: config.on_entry,
            on_exit: config.on_exit,
            on_transition: config.on_transition,
            timers: TimerRegistry::new(),
            epoch: 0,
        });

        for child in children {
            let child_id = self.insert(child, Some(id), context.clone());
            self[id].children.push(child_id);
        }
        id
    }
}

impl<C, E> Tree<C, E> {
    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn lookup(&self, id: &str) -> Option<NodeId> {
        self.registry.get(id).copied()
    }

    pub(crate) fn ids(&self) -> HashSet<String> {
        self.registry.keys().cloned().collect()
    }

    pub(crate) fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self[c].id == name)
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub(crate) fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self[id].parent;
        }
        false
    }

    /// Drop every remembered history value.
    pub(crate) fn forget_history(&mut self) {
        for node in &mut self.nodes {
            node.remembered = None;
        }
    }

    /// Nodes strictly below `ancestor` down to `node` inclusive, outermost first.
    pub(crate) fn path_from(&self, ancestor: NodeId, node: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                break;
            }
            path.push(id);
            cursor = self[id].parent;
        }
        path.reverse();
        path
    }

    /// Active nodes of the subtree at `start`, parents before children.
    pub(crate) fn active_pre_order(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !self[id].active {
                continue;
            }
            order.push(id);
            stack.extend(self[id].children.iter().rev().copied());
        }
        order
    }

    /// Active nodes of the subtree at `start`, children before parents.
    pub(crate) fn active_post_order(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = self.active_pre_order(start);
        order.reverse();
        order
    }

    /// Serialized value of the active configuration below `id`.
    pub(crate) fn value_of(&self, id: NodeId) -> StateValue {
        let node = &self[id];
        if node.is_leaf() {
            return StateValue::Leaf(node.id.clone());
        }
        if node.parallel {
            let regions = node
                .children
                .iter()
                .map(|&c| {
                    let child = &self[c];
                    let value = if child.is_leaf() {
                        StateValue::Branch(BTreeMap::new())
                    } else {
                        self.value_of(c)
                    };
                    (child.id.clone(), value)
                })
                .collect();
            return StateValue::Branch(regions);
        }
        match node.current.filter(|&c| self[c].active) {
            Some(c) if self[c].is_leaf() => StateValue::Leaf(self[c].id.clone()),
            Some(c) => StateValue::branch([(self[c].id.clone(), self.value_of(c))]),
            None => StateValue::Branch(BTreeMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DynEvent;

    type Config = StateConfig<(), DynEvent>;

    fn sample() -> Tree<(), DynEvent> {
        let root = Config::new("root")
            .context(())
            .state(
                Config::new("a")
                    .state(Config::new("a1"))
                    .state(Config::new("a2")),
            )
            .state(Config::new("b"));
        Tree::build(root, ContextCell::new(()))
    }

    #[test]
    fn registry_resolves_every_id() {
        let tree = sample();
        for id in ["root", "a", "a1", "a2", "b"] {
            assert!(tree.lookup(id).is_some(), "missing {id}");
        }
        assert!(tree.lookup("zzz").is_none());
        assert_eq!(tree.ids().len(), 5);
    }

    #[test]
    fn children_keep_document_order_and_parent_links() {
        let tree = sample();
        let a = tree.lookup("a").unwrap();
        let names: Vec<_> = tree[a].children.iter().map(|&c| tree[c].id.as_str()).collect();
        assert_eq!(names, vec!["a1", "a2"]);
        assert_eq!(tree[tree.lookup("a2").unwrap()].parent, Some(a));
    }

    #[test]
    fn path_from_excludes_ancestor() {
        let tree = sample();
        let path = tree.path_from(tree.root(), tree.lookup("a2").unwrap());
        let names: Vec<_> = path.iter().map(|&n| tree[n].id.as_str()).collect();
        assert_eq!(names, vec!["a", "a2"]);
    }

    #[test]
    fn contains_is_reflexive_and_upward_only() {
        let tree = sample();
        let a = tree.lookup("a").unwrap();
        let a1 = tree.lookup("a1").unwrap();
        assert!(tree.contains(a, a1));
        assert!(tree.contains(a1, a1));
        assert!(!tree.contains(a1, a));
    }

    #[test]
    fn nested_context_is_independent() {
        #[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
        struct Ctx {
            n: u32,
        }
        let root: StateConfig<Ctx, DynEvent> = StateConfig::new("root")
            .context(Ctx { n: 1 })
            .state(StateConfig::new("shared"))
            .state(
                StateConfig::new("own")
                    .context(Ctx { n: 2 })
                    .state(StateConfig::new("inner")),
            );
        let cell = ContextCell::new(Ctx { n: 1 });
        let tree = Tree::build(root, cell.clone());

        let shared = &tree[tree.lookup("shared").unwrap()];
        let inner = &tree[tree.lookup("inner").unwrap()];
        assert!(shared.context.same_cell(&cell));
        assert!(!inner.context.same_cell(&cell));
        assert_eq!(inner.context.get().n, 2);
    }

    #[test]
    fn active_orders_skip_inactive_nodes() {
        let mut tree = sample();
        for id in ["root", "a", "a2"] {
            let n = tree.lookup(id).unwrap();
            tree[n].active = true;
        }
        let a = tree.lookup("a").unwrap();
        let root = tree.root();
        tree[a].current = tree.lookup("a2");
        tree[root].current = Some(a);

        let pre: Vec<_> = tree
            .active_pre_order(tree.root())
            .iter()
            .map(|&n| tree[n].id.clone())
            .collect();
        assert_eq!(pre, vec!["root", "a", "a2"]);

        let post: Vec<_> = tree
            .active_post_order(tree.root())
            .iter()
            .map(|&n| tree[n].id.clone())
            .collect();
        assert_eq!(post, vec!["a2", "a", "root"]);

        assert_eq!(
            tree.value_of(tree.root()),
            StateValue::branch([("a", StateValue::leaf("a2"))])
        );
    }
}
