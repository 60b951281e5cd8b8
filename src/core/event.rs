//! Event trait for values dispatched into a state tree.
//!
//! Handler tables are keyed by [`Event::kind`]. Closed event sets should
//! use an enum (see the `event_enum!` macro); [`DynEvent`] covers open-ended
//! event types keyed by plain strings.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for events sent to a machine.
///
/// # Example
///
/// ```rust
/// use canopy::core::Event;
///
/// #[derive(Clone, Debug)]
/// enum Switch {
///     Toggle,
///     Reset { hard: bool },
/// }
///
/// impl Event for Switch {
///     fn kind(&self) -> &str {
///         match self {
///             Self::Toggle => "Toggle",
///             Self::Reset { .. } => "Reset",
///         }
///     }
/// }
///
/// assert_eq!(Switch::Reset { hard: true }.kind(), "Reset");
/// ```
pub trait Event: Clone + Debug + Send + Sync + 'static {
    /// The event type used to look up handlers.
    fn kind(&self) -> &str;
}

/// String-keyed event carrying an arbitrary JSON payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynEvent {
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl DynEvent {
    /// Event with no payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: serde_json::Value::Null,
        }
    }

    /// Event with a payload.
    pub fn with_data(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

impl Event for DynEvent {
    fn kind(&self) -> &str {
        &self.kind
    }
}

impl From<&str> for DynEvent {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}
