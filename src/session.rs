// 🔒 Automation session - the single shared browser-automation resource
//
// Adapters never reach for a global session. They receive a `SessionLease`,
// and dropping the lease releases the resource on every exit path.

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct SessionState {
    opened: u64,
    released: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub opened: u64,
    pub released: u64,
}

impl SessionStats {
    pub fn active(&self) -> u64 {
        self.opened - self.released
    }
}

#[derive(Debug, Default)]
pub struct SessionPool {
    state: Mutex<SessionState>,
}

impl SessionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the resource and lease it
    pub async fn acquire(&self) -> SessionLease<'_> {
        let mut guard = self.state.lock().await;
        guard.opened += 1;
        let id = Uuid::new_v4();
        debug!(session = %id, "session acquired");
        SessionLease { guard, id }
    }

    pub async fn stats(&self) -> SessionStats {
        let state = self.state.lock().await;
        SessionStats {
            opened: state.opened,
            released: state.released,
        }
    }
}

/// Exclusive use of the automation resource for one adapter call
pub struct SessionLease<'a> {
    guard: MutexGuard<'a, SessionState>,
    id: Uuid,
}

impl SessionLease<'_> {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for SessionLease<'_> {
    fn drop(&mut self) {
        self.guard.released += 1;
        debug!(session = %self.id, "session released");
    }
}
