//! Shared context store.
//!
//! A [`ContextCell`] holds one logical context value. Every write replaces
//! the stored `Arc<C>` with a new value; readers holding an earlier `Arc`
//! keep seeing the value they read. Two reads return pointer-equal `Arc`s
//! exactly when no write happened in between.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

/// Trait for machine context values.
///
/// Blanket-implemented for every type with the required bounds. The serde
/// bounds back keyed writes, shallow merges and checkpoints.
pub trait ContextValue:
    Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> ContextValue for T where
    T: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Errors raised by keyed or merging context writes.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContextError {
    #[error("Context does not serialize to an object; keyed writes need named fields")]
    NotAnObject,

    #[error("Context serialization failed: {0}")]
    Serialize(String),

    #[error("Context rejected the written value: {0}")]
    Deserialize(String),

    #[error("Context has no field named '{0}'")]
    UnknownField(String),
}

/// Shared handle to a context value.
///
/// Cloning the cell clones the handle, not the value: every clone observes
/// and replaces the same logical context.
pub struct ContextCell<C> {
    value: Arc<RwLock<Arc<C>>>,
}

impl<C> Clone for ContextCell<C> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<C: ContextValue> ContextCell<C> {
    pub fn new(initial: C) -> Self {
        Self {
            value: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Current value.
    pub fn get(&self) -> Arc<C> {
        Arc::clone(&self.value.read())
    }

    /// Replace the whole value.
    pub fn replace(&self, next: C) {
        *self.value.write() = Arc::new(next);
    }

    /// Functional replace: `f` receives the current value and returns the next.
    ///
    /// `f` runs without the lock held, so it may read this cell.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&C) -> C,
    {
        let current = self.get();
        let next = f(&current);
        *self.value.write() = Arc::new(next);
    }

    /// Point update of a single named field.
    pub fn set<V: Serialize>(&self, key: &str, value: V) -> Result<(), ContextError> {
        let value =
            serde_json::to_value(value).map_err(|e| ContextError::Serialize(e.to_string()))?;
        let mut patch = serde_json::Map::new();
        patch.insert(key.to_string(), value);
        self.merge(serde_json::Value::Object(patch))
    }

    /// Shallow merge of `partial` (a JSON object) into the current value.
    ///
    /// Every key must name an existing field; nothing is written otherwise.
    pub fn merge(&self, partial: serde_json::Value) -> Result<(), ContextError> {
        let serde_json::Value::Object(fields) = partial else {
            return Err(ContextError::NotAnObject);
        };
        let mut slot = self.value.write();
        let mut current =
            serde_json::to_value(&**slot).map_err(|e| ContextError::Serialize(e.to_string()))?;
        let Some(target) = current.as_object_mut() else {
            return Err(ContextError::NotAnObject);
        };
        for (key, value) in fields {
            if !target.contains_key(&key) {
                return Err(ContextError::UnknownField(key));
            }
            target.insert(key, value);
        }
        let next: C =
            serde_json::from_value(current).map_err(|e| ContextError::Deserialize(e.to_string()))?;
        *slot = Arc::new(next);
        Ok(())
    }

    /// Whether both cells share one logical context.
    pub fn same_cell(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl<C: ContextValue> Debug for ContextCell<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ContextCell").field(&*self.get()).finish()
    }
}
