//! Concurrency-safe mapping from client key to window state.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use super::window::ClientWindow;

/// Maps each client key to its sliding window state.
///
/// Lookups use an atomic insert-if-absent, so concurrent first-seen requests
/// for the same key all receive a handle to the same state object. Lock
/// granularity is per client: decisions for distinct keys never share a lock.
pub struct ClientRegistry {
    clients: DashMap<String, Arc<ClientWindow>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    /// Fetch the window state for `key`, creating zeroed state on first use.
    pub fn get_or_create(&self, key: &str) -> Arc<ClientWindow> {
        if let Some(window) = self.clients.get(key) {
            return Arc::clone(&window);
        }

        let window = self.clients.entry(key.to_string()).or_insert_with(|| {
            debug!(client = %key, "Creating window state for new client");
            Arc::new(ClientWindow::new())
        });
        Arc::clone(&window)
    }

    /// Drop entries whose current window start is more than `stale_after`
    /// behind `now`. Returns the number of entries removed.
    ///
    /// Bounds per-client state growth; the decision path never depends on it.
    pub fn evict_stale(&self, now: Duration, stale_after: Duration) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, window| match window.window_start() {
            Some(start) => now.saturating_sub(start) <= stale_after,
            None => true,
        });
        before.saturating_sub(self.clients.len())
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether any clients are tracked.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Remove all client state.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.clients.clear();
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
