//! Connection State: the shared up/down signal every other component blocks
//! on (SPEC_FULL §4.1).

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

/// Tracks whether the transport is currently connected and lets any number
/// of waiters block until it becomes so.
#[derive(Clone)]
pub struct ConnectionState {
    connected: Arc<Mutex<bool>>,
    notify: Arc<Notify>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            connected: Arc::new(Mutex::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    /// Transition state, waking any waiters on a false→true edge.
    pub fn set_connected(&self, connected: bool) {
        let was_connected = {
            let mut guard = self.connected.lock();
            let was = *guard;
            *guard = connected;
            was
        };
        if connected && !was_connected {
            self.notify.notify_waiters();
        }
    }

    /// Block until connected. Returns immediately if already connected.
    /// Rechecks the predicate in a loop — no spurious-wakeup assumptions.
    pub async fn wait_for_connection(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_connected() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
