//! Self-expiring exclusive lock for the in-process ring backend.
//!
//! The lock is two layers: a one-permit semaphore providing the actual
//! exclusion, and a bookkeeping mutex guarding the owner token and the
//! expiry timer. Expiry is a spawned single-shot task that re-checks the
//! acquisition it belongs to before releasing, so a successor who
//! re-acquired after a manual unlock is never kicked out by a stale timer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::RingError;

/// Identify the calling context: process ID plus tokio task ID, falling
/// back to the OS thread ID outside a runtime. Task IDs survive worker
/// thread migration, so the token is stable across await points.
pub(crate) fn caller_token() -> String {
    match tokio::task::try_id() {
        Some(task) => format!("{}/{task}", std::process::id()),
        None => format!("{}/{:?}", std::process::id(), std::thread::current().id()),
    }
}

#[derive(Default)]
struct LockState {
    /// Token of the current owner; `None` while the lock is free.
    owner: Option<String>,
    /// Bumped on every acquisition, so a stale expiry timer cannot release
    /// a successor who happens to carry the same caller token.
    generation: u64,
    /// Pending expiry timer, aborted on manual unlock.
    expiry: Option<JoinHandle<()>>,
}

struct LockInner {
    permit: Semaphore,
    state: Mutex<LockState>,
}

impl LockInner {
    /// Release the lock iff the acquisition that armed the timer is still
    /// the one holding it. A lost race against a manual unlock is a no-op.
    fn release_if_current(&self, generation: u64) {
        let mut state = self.state.lock().expect("lock poisoned");
        if state.generation != generation || state.owner.is_none() {
            return;
        }
        state.owner = None;
        state.expiry = None;
        self.permit.add_permits(1);
        debug!("ring lock expired");
    }
}

/// Exclusive lock with optional wall-clock auto-release.
pub(crate) struct ExpiringLock {
    inner: Arc<LockInner>,
}

impl ExpiringLock {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(LockInner {
                permit: Semaphore::new(1),
                state: Mutex::new(LockState::default()),
            }),
        }
    }

    /// Block until the lock is free, then take ownership.
    ///
    /// With `expire_secs > 0` a single-shot timer releases the lock after
    /// the delay unless the owner has unlocked (or been replaced) first.
    pub(crate) async fn lock(&self, expire_secs: i64) {
        let permit = self
            .inner
            .permit
            .acquire()
            .await
            .expect("lock semaphore closed");
        permit.forget();

        let mut state = self.inner.state.lock().expect("lock poisoned");
        state.owner = Some(caller_token());
        state.generation = state.generation.wrapping_add(1);
        state.expiry = if expire_secs > 0 {
            let generation = state.generation;
            let inner = Arc::clone(&self.inner);
            Some(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(expire_secs as u64)).await;
                inner.release_if_current(generation);
            }))
        } else {
            None
        };
    }

    /// Release the lock if the caller owns it.
    pub(crate) fn unlock(&self) -> Result<(), RingError> {
        let token = caller_token();
        let mut state = self.inner.state.lock().expect("lock poisoned");
        match state.owner.as_deref() {
            None => Err(RingError::LockNotHeld),
            Some(owner) if owner != token => Err(RingError::LockNotOwned),
            Some(_) => {
                state.owner = None;
                if let Some(timer) = state.expiry.take() {
                    timer.abort();
                }
                self.inner.permit.add_permits(1);
                Ok(())
            }
        }
    }
}
