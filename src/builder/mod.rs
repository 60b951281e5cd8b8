//! Builder API for ergonomic machine construction.
//!
//! This module provides the declarative state configuration, machine options,
//! validation of a whole tree before it is built, and a macro for closed
//! event enums.

pub mod config;
pub mod error;
pub mod machine;
pub mod macros;
pub mod options;
pub mod validate;

pub use config::StateConfig;
pub use error::{BuildError, ConfigError};
pub use machine::MachineBuilder;
pub use options::{InitialPolicy, MachineOptions};
pub use validate::{check_tree, validate_tree};

use crate::core::{ContextValue, Event};

/// Leaf state that moves to `target` on `kind`.
///
/// # Example
///
/// ```
/// use canopy::builder::{goto_state, StateConfig};
/// use canopy::core::DynEvent;
///
/// let off: StateConfig<(), DynEvent> = goto_state("off", "TOGGLE", "on");
/// assert_eq!(off.id(), "off");
/// ```
pub fn goto_state<C, E>(
    id: impl Into<String>,
    kind: impl Into<String>,
    target: impl Into<String>,
) -> StateConfig<C, E>
where
    C: ContextValue,
    E: Event,
{
    StateConfig::new(id).on_goto(kind, target)
}

/// Sequential state cycling through `ids` on `kind`, the last wrapping to the first.
///
/// # Example
///
/// ```
/// use canopy::builder::cycle;
/// use canopy::core::DynEvent;
///
/// let light = cycle::<(), DynEvent>("light", "NEXT", &["green", "yellow", "red"]);
/// assert_eq!(light.children().len(), 3);
/// ```
pub fn cycle<C, E>(id: impl Into<String>, kind: &str, ids: &[&str]) -> StateConfig<C, E>
where
    C: ContextValue,
    E: Event,
{
    let children = ids
        .iter()
        .enumerate()
        .map(|(i, &state)| goto_state(state, kind, ids[(i + 1) % ids.len()]));
    StateConfig::new(id).states(children)
}
