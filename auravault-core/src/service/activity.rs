//! User-activity signal consumed by the auto-lock timer.
//!
//! What counts as activity (keystrokes, pointer moves, commands) is up to
//! the front end; the vault only needs a callback to fire.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Callback invoked on each activity signal
pub type ActivityCallback = Arc<dyn Fn() + Send + Sync>;

/// Source of activity signals
pub trait ActivitySource: Send + Sync {
    /// Register a callback; it stays registered until the returned
    /// subscription is dropped
    fn on_activity(&self, callback: ActivityCallback) -> Subscription;
}

/// Handle for a registered callback
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

type Listeners = Mutex<HashMap<u64, ActivityCallback>>;

/// In-process activity source
#[derive(Clone, Default)]
pub struct ActivityHub {
    listeners: Arc<Listeners>,
    next_id: Arc<AtomicU64>,
}

impl ActivityHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify every subscriber that activity occurred
    pub fn signal(&self) {
        // Snapshot so callbacks run without the lock held
        let callbacks: Vec<ActivityCallback> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for callback in callbacks {
            callback();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ActivitySource for ActivityHub {
    fn on_activity(&self, callback: ActivityCallback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, callback);

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
            }
        })
    }
}
