//! Shared vault handle with auto-lock
//!
//! Wraps a [`VaultSession`] in an async mutex so that concurrent callers
//! (and the auto-lock watcher) are serialized, and drives the
//! [`AutoLockTimer`] from the session's lock state.

use crate::{
    record::{DecryptedRecord, RecordSummary},
    service::{
        activity::{ActivitySource, Subscription},
        autolock::AutoLockTimer,
    },
    session::{VaultSession, VaultState},
    storage::RecordStore,
    Result, VaultError,
};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Vault session shared between callers and the auto-lock task
pub struct VaultService<S: RecordStore + 'static> {
    session: Arc<Mutex<VaultSession<S>>>,
    timer: Arc<AutoLockTimer>,
    state: Arc<watch::Sender<VaultState>>,
    watcher: JoinHandle<()>,
    activity: std::sync::Mutex<Option<Subscription>>,
}

impl<S: RecordStore + 'static> VaultService<S> {
    /// Wrap a session and start the auto-lock watcher
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(session: VaultSession<S>, auto_lock_timeout: Duration) -> Self {
        let (state, _) = watch::channel(session.state());
        let state = Arc::new(state);
        let session = Arc::new(Mutex::new(session));
        let timer = Arc::new(AutoLockTimer::new(auto_lock_timeout));

        let watcher = tokio::spawn(run_auto_lock(
            session.clone(),
            timer.clone(),
            state.clone(),
        ));

        Self {
            session,
            timer,
            state,
            watcher,
            activity: std::sync::Mutex::new(None),
        }
    }

    /// Unlock the vault and arm the auto-lock timer
    pub async fn unlock(&self, passphrase: &str) -> Result<()> {
        let session = self.session.clone().lock_owned().await;
        self.state.send_replace(VaultState::Unlocking);

        let passphrase = Zeroizing::new(passphrase.to_string());
        let attempt = run_blocking(session, move |s| s.unlock(&passphrase)).await;
        let (session, result) = match attempt {
            Ok(done) => done,
            Err(e) => {
                self.lock().await;
                return Err(e);
            }
        };

        // Rejected input leaves an open session open
        match &result {
            Ok(()) => self.timer.arm(),
            Err(_) if !session.is_unlocked() => self.timer.disarm(),
            Err(_) => {}
        }
        self.state.send_replace(session.state());
        result
    }

    /// Lock the vault and cancel the pending auto-lock
    pub async fn lock(&self) {
        let mut session = self.session.lock().await;
        session.lock();
        self.timer.disarm();
        self.state.send_replace(session.state());
    }

    pub async fn add_secret(&self, title: &str, content: &str) -> Result<DecryptedRecord> {
        let title = title.to_string();
        let content = Zeroizing::new(content.to_string());

        let session = self.session.clone().lock_owned().await;
        let (_session, result) =
            run_blocking(session, move |s| s.add_secret(&title, &content)).await?;
        let added = result?;
        self.timer.record_activity();
        Ok(added)
    }

    pub async fn update_secret(&self, id: &str, content: &str) -> Result<()> {
        let id = id.to_string();
        let content = Zeroizing::new(content.to_string());

        let session = self.session.clone().lock_owned().await;
        let (_session, result) =
            run_blocking(session, move |s| s.update_secret(&id, &content)).await?;
        result?;
        self.timer.record_activity();
        Ok(())
    }

    pub async fn rotate_passphrase(&self, old_passphrase: &str, new_passphrase: &str) -> Result<()> {
        let old_passphrase = Zeroizing::new(old_passphrase.to_string());
        let new_passphrase = Zeroizing::new(new_passphrase.to_string());

        let session = self.session.clone().lock_owned().await;
        let (_session, result) = run_blocking(session, move |s| {
            s.rotate_passphrase(&old_passphrase, &new_passphrase)
        })
        .await?;
        result?;
        self.timer.record_activity();
        Ok(())
    }

    /// Snapshot of the plaintext records; empty while locked
    pub async fn decrypted_records(&self) -> Vec<DecryptedRecord> {
        self.session.lock().await.decrypted_records().to_vec()
    }

    pub async fn list_records(&self) -> Result<Vec<RecordSummary>> {
        let session = self.session.clone().lock_owned().await;
        let (_session, result) = run_blocking(session, |s| s.list_records()).await?;
        result
    }

    /// Current state without waiting on an in-flight operation
    pub fn state(&self) -> VaultState {
        *self.state.borrow()
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == VaultState::Unlocked
    }

    /// Watch state transitions, including auto-locks
    pub fn subscribe_state(&self) -> watch::Receiver<VaultState> {
        self.state.subscribe()
    }

    /// Record activity (resets the auto-lock timer)
    pub fn record_activity(&self) {
        self.timer.record_activity();
    }

    pub fn time_until_lock(&self) -> Option<Duration> {
        self.timer.time_until_lock()
    }

    /// Reset the auto-lock timer whenever `source` signals activity
    ///
    /// Replaces any previously attached source.
    pub fn attach_activity_source(&self, source: &dyn ActivitySource) {
        let timer = self.timer.clone();
        let subscription = source.on_activity(Arc::new(move || timer.record_activity()));
        *self
            .activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
    }

    pub fn detach_activity_source(&self) {
        self.activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl<S: RecordStore + 'static> Drop for VaultService<S> {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

type SessionGuard<S> = OwnedMutexGuard<VaultSession<S>>;

/// Run a session operation on the blocking pool
///
/// Key derivation and store I/O must not stall the async workers. The
/// guard travels with the operation and is handed back, so the caller
/// still holds the session mutex when it updates the timer and state.
async fn run_blocking<S, T, F>(
    mut session: SessionGuard<S>,
    op: F,
) -> Result<(SessionGuard<S>, Result<T>)>
where
    S: RecordStore + 'static,
    T: Send + 'static,
    F: FnOnce(&mut VaultSession<S>) -> Result<T> + Send + 'static,
{
    task::spawn_blocking(move || {
        let result = op(&mut session);
        (session, result)
    })
    .await
    .map_err(|e| VaultError::Internal(format!("Vault task failed: {}", e)))
}

/// Sleep until the armed deadline and lock the session when it passes
///
/// The deadline is re-checked with the session mutex held, so a timer that
/// was reset, disarmed or re-armed while this task slept never locks.
async fn run_auto_lock<S: RecordStore + 'static>(
    session: Arc<Mutex<VaultSession<S>>>,
    timer: Arc<AutoLockTimer>,
    state: Arc<watch::Sender<VaultState>>,
) {
    let mut deadlines = timer.subscribe();

    loop {
        let deadline: Option<Instant> = *deadlines.borrow_and_update();

        let Some(at) = deadline else {
            if deadlines.changed().await.is_err() {
                return;
            }
            continue;
        };

        tokio::select! {
            _ = time::sleep_until(at) => {
                let mut guard = session.lock().await;
                if timer.deadline() != Some(at) {
                    debug!("Auto-lock deadline moved, not locking");
                } else if guard.is_unlocked() {
                    warn!("Auto-locking vault due to inactivity");
                    guard.lock();
                    timer.disarm();
                    state.send_replace(guard.state());
                } else {
                    debug!("Auto-lock deadline passed while locked, disarming");
                    timer.disarm();
                }
            }
            changed = deadlines.changed() => {
                if changed.is_err() {
                    info!("Auto-lock timer dropped, watcher exiting");
                    return;
                }
            }
        }
    }
}
