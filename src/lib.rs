//! Canopy: hierarchical state machines on Stillwater effects
//!
//! Canopy runs a tree of states. Sequential states keep exactly one child
//! active, parallel states keep all of them active, and transitions exit and
//! enter only the part of the tree below the least common ancestor of their
//! source and target.
//!
//! # Core Concepts
//!
//! - **State tree**: declared with `StateConfig`, validated as a whole and
//!   built into a per-machine node arena
//! - **Handlers**: entry, exit, event and delayed callbacks are Stillwater
//!   effects returning a `Reaction`
//! - **Context**: one shared value per tree, replaced on every write
//! - **Serialized state**: a nested string/map value of active states,
//!   delivered to subscribers after every settled transition
//!
//! # Example
//!
//! ```rust
//! use canopy::builder::StateConfig;
//! use canopy::core::{DynEvent, StateValue};
//! use canopy::effects::{Machine, Reaction};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Default, Serialize, Deserialize)]
//! struct Switch {
//!     flips: u32,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let machine = Machine::new(
//!     StateConfig::<Switch, DynEvent>::new("switch")
//!         .context(Switch::default())
//!         .state(StateConfig::new("off").on_goto("TOGGLE", "on"))
//!         .state(
//!             StateConfig::new("on")
//!                 .entry_fn(|p| {
//!                     p.update_context(|c: &Switch| Switch { flips: c.flips + 1 });
//!                     Ok(Reaction::Stay)
//!                 })
//!                 .on_goto("TOGGLE", "off"),
//!         ),
//! )
//! .unwrap();
//!
//! machine.start().await.unwrap();
//! machine.send("TOGGLE".into()).await.unwrap();
//!
//! assert_eq!(machine.state().await, StateValue::leaf("on"));
//! assert_eq!(machine.context().flips, 1);
//! # }
//! ```

pub mod builder;
pub mod checkpoint;
pub mod core;
pub mod effects;

// Re-export commonly used types
pub use builder::{MachineBuilder, MachineOptions, StateConfig};
pub use checkpoint::Checkpoint;
pub use crate::core::{DynEvent, Event, HistoryMode, StateValue};
pub use effects::{Machine, MachineError, Reaction};
