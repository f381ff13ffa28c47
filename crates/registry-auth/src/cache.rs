//! In-memory token cache keyed by registry host.
//!
//! Entries are replaced whole; a reader never sees a partially written token.
//! Each host also owns an exclusive section so that check-fetch-store runs for
//! at most one caller per host at a time.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Cached registry credential.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    /// Temporary username issued alongside the token.
    pub username: String,

    /// Authorization token used as the registry password.
    pub token: String,

    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_usable(&self) -> bool {
        !self.token.is_empty()
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Guard for a host's exclusive section. Released on drop.
pub type HostGuard = OwnedMutexGuard<()>;

/// Per-host token cache.
#[derive(Debug, Default)]
pub struct TokenCache {
    entries: RwLock<HashMap<String, CachedToken>>,
    host_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff an entry is present for `host` and its token is non-empty.
    pub async fn exists(&self, host: &str) -> bool {
        self.entries
            .read()
            .await
            .get(host)
            .is_some_and(CachedToken::is_usable)
    }

    /// Expiry of the cached token for `host`.
    ///
    /// Callers check [`exists`](Self::exists) first; `None` means there is
    /// nothing usable cached and must be treated as expired.
    pub async fn expiry(&self, host: &str) -> Option<DateTime<Utc>> {
        self.get(host).await.map(|t| t.expires_at)
    }

    /// Usable entry for `host`, if any.
    pub async fn get(&self, host: &str) -> Option<CachedToken> {
        self.entries
            .read()
            .await
            .get(host)
            .filter(|t| t.is_usable())
            .cloned()
    }

    /// Replace the entry for `host`.
    pub async fn put(&self, host: impl Into<String>, token: CachedToken) {
        self.entries.write().await.insert(host.into(), token);
    }

    /// Drop the entry for `host`. Returns whether one was present.
    pub async fn remove(&self, host: &str) -> bool {
        self.entries.write().await.remove(host).is_some()
    }

    /// Enter the exclusive section for `host`, waiting for any current holder.
    ///
    /// Locks nobody holds or waits on are dropped here, so the lock table only
    /// grows with the number of hosts in use at the same time.
    pub async fn lock_host(&self, host: &str) -> HostGuard {
        let lock = {
            let mut locks = self.host_locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(host.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked_locks(&self) -> usize {
        self.host_locks.lock().await.len()
    }
}
