//! Auto-lock functionality for vault security.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Default inactivity timeout (5 minutes)
pub const DEFAULT_AUTO_LOCK_TIMEOUT: Duration = Duration::from_secs(300);

/// Resettable single-shot deadline
///
/// Armed while the vault is unlocked, disarmed while locked. The current
/// deadline is published on a watch channel so a watcher task can sleep
/// until it and notice re-arming or disarming.
pub struct AutoLockTimer {
    timeout_ms: AtomicU64,
    deadline: watch::Sender<Option<Instant>>,
}

impl AutoLockTimer {
    /// Create a disarmed timer
    pub fn new(timeout: Duration) -> Self {
        let (deadline, _) = watch::channel(None);
        Self {
            timeout_ms: AtomicU64::new(as_millis(timeout)),
            deadline,
        }
    }

    /// Start the countdown from now
    pub fn arm(&self) {
        let at = Instant::now() + self.timeout();
        self.deadline.send_replace(Some(at));
    }

    /// Cancel any pending deadline
    pub fn disarm(&self) {
        self.deadline.send_replace(None);
    }

    /// Push the deadline forward; no effect while disarmed
    pub fn record_activity(&self) {
        let at = Instant::now() + self.timeout();
        self.deadline.send_if_modified(|deadline| match deadline {
            Some(current) => {
                *current = at;
                true
            }
            None => false,
        });
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.borrow().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        *self.deadline.borrow()
    }

    /// Check if the deadline has passed
    pub fn should_lock(&self) -> bool {
        match self.deadline() {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }

    /// Get the time until lock
    pub fn time_until_lock(&self) -> Option<Duration> {
        self.deadline()
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Relaxed))
    }

    /// Set the timeout duration; applies from the next arm or activity
    pub fn set_timeout(&self, timeout: Duration) {
        self.timeout_ms.store(as_millis(timeout), Ordering::Relaxed);
    }

    /// Watch the deadline
    pub fn subscribe(&self) -> watch::Receiver<Option<Instant>> {
        self.deadline.subscribe()
    }
}

fn as_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

impl Default for AutoLockTimer {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_LOCK_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_auto_lock_timeout() {
        let timer = AutoLockTimer::new(Duration::from_millis(100));
        timer.arm();

        assert!(!timer.should_lock());

        advance(Duration::from_millis(150)).await;

        assert!(timer.should_lock());
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_resets_timer() {
        let timer = AutoLockTimer::new(Duration::from_millis(250));
        timer.arm();

        advance(Duration::from_millis(200)).await;
        timer.record_activity();

        advance(Duration::from_millis(200)).await;
        assert!(!timer.should_lock());

        advance(Duration::from_millis(60)).await;
        assert!(timer.should_lock());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_timer_never_locks() {
        let timer = AutoLockTimer::new(Duration::from_millis(50));
        timer.arm();
        timer.disarm();

        advance(Duration::from_millis(100)).await;

        assert!(!timer.should_lock());
        assert!(timer.time_until_lock().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_does_not_arm() {
        let timer = AutoLockTimer::new(Duration::from_secs(5));
        timer.record_activity();
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_until_lock() {
        let timer = AutoLockTimer::new(Duration::from_secs(5));
        timer.arm();

        advance(Duration::from_secs(2)).await;
        assert_eq!(timer.time_until_lock(), Some(Duration::from_secs(3)));

        advance(Duration::from_secs(10)).await;
        assert_eq!(timer.time_until_lock(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_timeout_applies_from_next_arm() {
        let timer = AutoLockTimer::new(Duration::from_secs(60));
        timer.arm();

        timer.set_timeout(Duration::from_millis(1500));
        assert_eq!(timer.timeout(), Duration::from_millis(1500));
        assert_eq!(timer.time_until_lock(), Some(Duration::from_secs(60)));

        timer.arm();
        assert_eq!(timer.time_until_lock(), Some(Duration::from_millis(1500)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_rearm() {
        let timer = AutoLockTimer::default();
        let mut rx = timer.subscribe();
        assert_eq!(*rx.borrow_and_update(), None);

        timer.arm();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), timer.deadline());

        timer.set_timeout(Duration::from_secs(1));
        advance(Duration::from_millis(10)).await;
        timer.record_activity();
        assert_eq!(
            timer.time_until_lock(),
            Some(Duration::from_secs(1))
        );
        assert!(rx.has_changed().unwrap());
    }
}
