//! Per-node registry of scheduled delayed callbacks.

use tokio::task::JoinHandle;

/// Outstanding timers owned by one state node.
///
/// Clearing aborts every timer task; an aborted task never runs its
/// callback, even if its delay has already elapsed.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    handles: Vec<JoinHandle<()>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(handle);
    }

    /// Number of timers that have not finished yet.
    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Abort and forget every timer.
    pub fn clear(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}
