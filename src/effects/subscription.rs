//! Ordered observer list notified after every settled transition.

use crate::core::StateValue;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Observer called with the machine value and root context.
pub type Listener<C> = Arc<dyn Fn(&StateValue, &Arc<C>) + Send + Sync>;

type Entries<C> = Mutex<Vec<(Uuid, Listener<C>)>>;

pub(crate) struct Subscribers<C> {
    entries: Arc<Entries<C>>,
}

impl<C> Clone for Subscribers<C> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<C> Default for Subscribers<C> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<C> Subscribers<C> {
    pub(crate) fn add(&self, listener: Listener<C>) -> Subscription<C> {
        let id = Uuid::new_v4();
        self.entries.lock().push((id, listener));
        Subscription {
            id,
            entries: Arc::downgrade(&self.entries),
        }
    }

    /// Call every listener in subscription order.
    ///
    /// The list is copied first so listeners may unsubscribe while notified.
    pub(crate) fn notify(&self, value: &StateValue, context: &Arc<C>) {
        let listeners: Vec<Listener<C>> = self
            .entries
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(value, context);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Handle returned by `Machine::subscribe`.
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription<C> {
    id: Uuid,
    entries: Weak<Entries<C>>,
}

impl<C> Subscription<C> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Remove the listener. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(entries) = self.entries.upgrade() else {
            return false;
        };
        let mut entries = entries.lock();
        let before = entries.len();
        entries.retain(|(id, _)| *id != self.id);
        entries.len() != before
    }
}
