//! Connected flag shared between an endpoint and its background tasks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{error, warn};

/// Connected flag tagged with a session generation.
///
/// Every teardown bumps the generation, so a task that outlives its session
/// cannot clear the flag of a newer one.
#[derive(Debug, Default)]
pub struct ConnectionState {
    connected: AtomicBool,
    generation: AtomicU64,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn mark_connected(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Clear the flag and start a new generation, returning it.
    pub fn invalidate(&self) -> u64 {
        self.connected.store(false, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Guard for a task belonging to the current generation.
    pub fn guard(self: &Arc<Self>, task: &'static str) -> TaskGuard {
        TaskGuard {
            state: self.clone(),
            generation: self.generation(),
            task,
        }
    }
}

/// Clears the connected flag when a session task ends, whether it returned or
/// unwound from a panic. Tasks of an older generation leave the flag alone.
pub struct TaskGuard {
    state: Arc<ConnectionState>,
    generation: u64,
    task: &'static str,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if self.state.generation() != self.generation {
            return;
        }
        if std::thread::panicking() {
            error!("{} panicked", self.task);
        } else {
            warn!("{} ended", self.task);
        }
        self.state.connected.store(false, Ordering::SeqCst);
    }
}
