//! Single-owner exclusive lock over the local accelerator.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LockError;

#[derive(Debug)]
struct Holder {
    owner_id: String,
    acquired_at: DateTime<Utc>,
}

/// Point-in-time view of the lock, returned by [`ResourceLock::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct LockStatus {
    pub is_locked: bool,
    pub owner_id: Option<String>,
    pub acquired_at: Option<DateTime<Utc>>,
    /// How long the current holder has had the lock, in milliseconds.
    pub held_for_ms: Option<u64>,
}

impl LockStatus {
    /// Hold duration as a [`Duration`], if locked.
    #[must_use]
    pub fn held_for(&self) -> Option<Duration> {
        self.held_for_ms.map(Duration::from_millis)
    }
}

/// Mutual exclusion over the accelerator, keyed by an opaque owner id.
///
/// First come, first served: there is no queue and no timeout-based release.
/// A caller that loses the race gets [`LockError::Busy`] and retries on its own.
#[derive(Debug, Default)]
pub struct ResourceLock {
    holder: Mutex<Option<Holder>>,
}

impl ResourceLock {
    /// Creates an unlocked resource.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `owner_id`.
    ///
    /// # Errors
    /// Returns [`LockError::Busy`] if anyone, including `owner_id`, already
    /// holds the lock.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn lock(&self, owner_id: &str) -> Result<DateTime<Utc>, LockError> {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut holder = self.holder.lock().expect("resource lock mutex poisoned");
        if holder.is_some() {
            tracing::debug!(owner_id, "lock refused: busy");
            return Err(LockError::Busy);
        }
        let acquired_at = Utc::now();
        *holder = Some(Holder { owner_id: owner_id.to_owned(), acquired_at });
        tracing::info!(owner_id, "accelerator locked");
        Ok(acquired_at)
    }

    /// Releases the lock held by `owner_id`. Unlocking a free resource is a no-op.
    ///
    /// # Errors
    /// Returns [`LockError::Unauthorized`] if another owner holds the lock;
    /// the lock is left untouched.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn unlock(&self, owner_id: &str) -> Result<(), LockError> {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut holder = self.holder.lock().expect("resource lock mutex poisoned");
        let Some(current) = holder.as_ref() else {
            return Ok(());
        };
        if current.owner_id != owner_id {
            tracing::warn!(owner_id, "unlock rejected: not the holder");
            return Err(LockError::Unauthorized { requested_by: owner_id.to_owned() });
        }
        let held_ms = (Utc::now() - current.acquired_at).num_milliseconds();
        *holder = None;
        tracing::info!(owner_id, held_ms, "accelerator unlocked");
        Ok(())
    }

    /// Returns the current lock state without modifying it.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn status(&self) -> LockStatus {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let holder = self.holder.lock().expect("resource lock mutex poisoned");
        match holder.as_ref() {
            None => LockStatus {
                is_locked: false,
                owner_id: None,
                acquired_at: None,
                held_for_ms: None,
            },
            Some(h) => {
                let held = (Utc::now() - h.acquired_at).to_std().unwrap_or_default();
                LockStatus {
                    is_locked: true,
                    owner_id: Some(h.owner_id.clone()),
                    acquired_at: Some(h.acquired_at),
                    held_for_ms: Some(u64::try_from(held.as_millis()).unwrap_or(u64::MAX)),
                }
            }
        }
    }

    /// Returns `true` if `owner_id` currently holds the lock.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn is_held_by(&self, owner_id: &str) -> bool {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let holder = self.holder.lock().expect("resource lock mutex poisoned");
        holder.as_ref().is_some_and(|h| h.owner_id == owner_id)
    }
}
