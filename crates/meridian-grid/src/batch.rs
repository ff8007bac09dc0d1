//! Scoped suppression of change notifications.
//!
//! Bulk operations (configuration restore, programmatic fills) would
//! otherwise fire one redraw notification per mutation. A [`BatchGuard`]
//! suppresses emission for as long as it is alive; guards nest.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// RAII handle that suppresses change notifications while alive.
///
/// Obtained from `begin_batch()` on the cascade or the span index.
/// Notifications made during the batch are dropped, not queued; the caller
/// is expected to trigger one repaint after the batch.
#[must_use = "notifications resume when the guard is dropped"]
pub struct BatchGuard {
    depth: Arc<AtomicUsize>,
}

impl BatchGuard {
    pub(crate) fn acquire(depth: &Arc<AtomicUsize>) -> Self {
        depth.fetch_add(1, Ordering::SeqCst);
        Self {
            depth: depth.clone(),
        }
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

/// `true` when no batch guard is alive for `depth`.
pub(crate) fn reporting(depth: &Arc<AtomicUsize>) -> bool {
    depth.load(Ordering::SeqCst) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guards_nest() {
        let depth = Arc::new(AtomicUsize::new(0));
        assert!(reporting(&depth));

        let outer = BatchGuard::acquire(&depth);
        {
            let _inner = BatchGuard::acquire(&depth);
            assert!(!reporting(&depth));
        }
        assert!(!reporting(&depth));

        drop(outer);
        assert!(reporting(&depth));
    }
}
