//! Bounded pool of automated sessions with rotating identities.
//!
//! Acquisition blocks cooperatively when the pool is exhausted, which is the
//! natural backpressure point for the whole pipeline. Every acquired session
//! is guaranteed to return its identity slot on drop, on every exit path.

use crate::error::{Result, StealthError};
use crate::fingerprint::SessionProfile;
use jobpilot_core::StealthConfig;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

struct PoolInner {
    semaphore: Arc<Semaphore>,
    /// Identity profiles not currently bound to a session.
    available: Mutex<Vec<SessionProfile>>,
    max_profile_uses: u32,
}

/// Fixed-size pool of stealth sessions.
///
/// Pool size fixes the number of simultaneous automated sessions. Identity
/// profiles rotate: a profile used more than the configured limit, or flagged
/// after a detected block, is retired and replaced with a fresh one.
#[derive(Clone)]
pub struct StealthSessionPool {
    inner: Arc<PoolInner>,
}

impl StealthSessionPool {
    /// Create a pool with `config.pool_size` slots, each seeded with a
    /// randomized identity profile.
    #[must_use]
    pub fn new(config: &StealthConfig) -> Self {
        let size = config.pool_size.max(1);
        let profiles = (0..size).map(|_| SessionProfile::randomized()).collect();

        Self {
            inner: Arc::new(PoolInner {
                semaphore: Arc::new(Semaphore::new(size)),
                available: Mutex::new(profiles),
                max_profile_uses: config.max_profile_uses,
            }),
        }
    }

    /// Acquire a session, blocking cooperatively while the pool is exhausted.
    ///
    /// Returns [`StealthError::Canceled`] if the token fires first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<ScopedSession> {
        if cancel.is_cancelled() {
            return Err(StealthError::Canceled);
        }

        let permit = tokio::select! {
            () = cancel.cancelled() => return Err(StealthError::Canceled),
            permit = self.inner.semaphore.clone().acquire_owned() => {
                permit.map_err(|_| StealthError::PoolClosed)?
            }
        };

        let profile = {
            let mut available = self
                .inner
                .available
                .lock()
                .expect("acquire lock on session profiles");

            if available.is_empty() {
                // Slot count and profile count match; this only happens if a
                // guard was leaked. Recover with a fresh identity.
                SessionProfile::randomized()
            } else {
                let idx = rand::thread_rng().gen_range(0..available.len());
                available.swap_remove(idx)
            }
        };

        Ok(ScopedSession {
            profile: Some(profile),
            inner: self.inner.clone(),
            flagged: AtomicBool::new(false),
            _permit: permit,
        })
    }

    /// Number of sessions that could be acquired right now without blocking.
    #[must_use]
    pub fn available_slots(&self) -> usize {
        self.inner.semaphore.available_permits()
    }
}

/// Scoped session handle.
///
/// Holding this is holding one pool slot. Dropping it, on any exit path,
/// returns the slot and either recycles or retires the identity profile.
pub struct ScopedSession {
    profile: Option<SessionProfile>,
    inner: Arc<PoolInner>,
    flagged: AtomicBool,
    _permit: OwnedSemaphorePermit,
}

impl ScopedSession {
    /// The identity profile bound to this session.
    #[must_use]
    pub fn profile(&self) -> &SessionProfile {
        self.profile
            .as_ref()
            .expect("profile present until drop")
    }

    /// Mark this session's identity as detected (blocked or challenged).
    ///
    /// The profile will be retired instead of recycled when the session is
    /// released.
    pub fn flag_detected(&self) {
        self.flagged.store(true, Ordering::SeqCst);
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        let Some(mut profile) = self.profile.take() else {
            return;
        };
        profile.uses += 1;

        let retire =
            self.flagged.load(Ordering::SeqCst) || profile.uses >= self.inner.max_profile_uses;

        let returned = if retire {
            tracing::debug!(
                uses = profile.uses,
                flagged = self.flagged.load(Ordering::SeqCst),
                "retiring session profile"
            );
            SessionProfile::randomized()
        } else {
            profile
        };

        if let Ok(mut available) = self.inner.available.lock() {
            available.push(returned);
        }
        // Permit is released by dropping _permit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config(pool_size: usize, max_uses: u32) -> StealthConfig {
        StealthConfig {
            pool_size,
            max_profile_uses: max_uses,
            ..StealthConfig::default()
        }
    }

    #[tokio::test]
    async fn test_acquire_release() {
        let pool = StealthSessionPool::new(&test_config(2, 10));
        let cancel = CancellationToken::new();

        assert_eq!(pool.available_slots(), 2);

        let session = pool.acquire(&cancel).await.expect("acquire");
        assert_eq!(pool.available_slots(), 1);
        assert!(!session.profile().user_agent.is_empty());

        drop(session);
        assert_eq!(pool.available_slots(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_pool_blocks_until_release() {
        let pool = StealthSessionPool::new(&test_config(1, 10));
        let cancel = CancellationToken::new();

        let held = pool.acquire(&cancel).await.expect("acquire");

        let pool_clone = pool.clone();
        let cancel_clone = cancel.clone();
        let waiter = tokio::spawn(async move {
            pool_clone.acquire(&cancel_clone).await.expect("acquire after release")
        });

        // Waiter cannot proceed while the slot is held
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let session = waiter.await.expect("join waiter");
        drop(session);
    }

    #[tokio::test]
    async fn test_acquire_respects_cancellation() {
        let pool = StealthSessionPool::new(&test_config(1, 10));
        let cancel = CancellationToken::new();

        let _held = pool.acquire(&cancel).await.expect("acquire");

        cancel.cancel();
        let result = pool.acquire(&cancel).await;
        assert!(matches!(result, Err(StealthError::Canceled)));
    }

    #[tokio::test]
    async fn test_profile_rotated_after_max_uses() {
        let pool = StealthSessionPool::new(&test_config(1, 2));
        let cancel = CancellationToken::new();

        let first_ua;
        {
            let session = pool.acquire(&cancel).await.expect("acquire");
            first_ua = session.profile().user_agent.clone();
        }
        // Second use hits the limit, profile retired on release
        {
            let session = pool.acquire(&cancel).await.expect("acquire");
            assert_eq!(session.profile().uses, 1);
            let _ = first_ua;
        }

        let session = pool.acquire(&cancel).await.expect("acquire");
        assert_eq!(session.profile().uses, 0, "expected a fresh profile");
    }

    #[tokio::test]
    async fn test_flagged_profile_retired() {
        let pool = StealthSessionPool::new(&test_config(1, 100));
        let cancel = CancellationToken::new();

        {
            let session = pool.acquire(&cancel).await.expect("acquire");
            session.flag_detected();
        }

        let session = pool.acquire(&cancel).await.expect("acquire");
        assert_eq!(session.profile().uses, 0, "flagged profile must be replaced");
    }
}
