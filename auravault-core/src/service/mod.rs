//! Async vault service: serialized shared access plus inactivity auto-lock.

pub mod activity;
pub mod autolock;
pub mod vault_service;

pub use activity::{ActivityCallback, ActivityHub, ActivitySource, Subscription};
pub use autolock::{AutoLockTimer, DEFAULT_AUTO_LOCK_TIMEOUT};
pub use vault_service::VaultService;
