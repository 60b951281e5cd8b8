//! Builder for constructing machines.

use crate::builder::config::StateConfig;
use crate::builder::error::{BuildError, ConfigError};
use crate::builder::options::MachineOptions;
use crate::builder::validate::check_tree;
use crate::core::{ContextCell, ContextValue, Event};
use crate::effects::{Machine, Tree};
use std::collections::HashSet;

/// Builder turning a root [`StateConfig`] into a [`Machine`].
///
/// Validation runs over the whole tree before anything is built, so every
/// configuration problem is reported at once.
pub struct MachineBuilder<C, E> {
    root: StateConfig<C, E>,
    options: MachineOptions,
}

impl<C: ContextValue, E: Event> MachineBuilder<C, E> {
    pub fn new(root: StateConfig<C, E>) -> Self {
        Self {
            root,
            options: MachineOptions::default(),
        }
    }

    pub fn options(mut self, options: MachineOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate the configuration and build the machine.
    ///
    /// The machine is not started.
    pub fn build(mut self) -> Result<Machine<C, E>, BuildError> {
        check_tree(
            &self.root,
            &HashSet::new(),
            self.options.initial_policy,
            true,
        )?;

        let context = self
            .root
            .context
            .take()
            .map(ContextCell::new)
            .ok_or_else(|| {
                BuildError::InvalidConfig(vec![ConfigError::MissingRootContext {
                    root: self.root.id.clone(),
                }])
            })?;
        let tree = Tree::build(self.root, context.clone());
        tracing::debug!(states = tree.ids().len(), "machine built");

        Ok(Machine::assemble(tree, context, &self.options))
    }
}
