use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::map::MapLike;

/// A lazily created per-key lock.
pub type KeyLock = Arc<Mutex<()>>;

/// Per-key mutual exclusion.
///
/// Two callers presenting the same key never run their critical sections
/// concurrently; callers presenting different keys never block each other.
/// Waiters queue on the underlying [`Mutex`], which hands the lock over in
/// FIFO order.
///
/// Locks are created on first use and retained for the lifetime of the map,
/// so memory grows with the number of distinct keys ever presented.
pub struct LockMap<K, S = HashMap<K, KeyLock>> {
    locks: std::sync::Mutex<S>,
    _key: PhantomData<fn(K) -> K>,
}

impl<K: Eq + Hash> LockMap<K> {
    /// Creates an empty lock map over the default [`HashMap`] store.
    pub fn new() -> Self {
        Self::with_store(HashMap::new())
    }
}

impl<K: Eq + Hash> Default for LockMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> LockMap<K, S>
where
    S: MapLike<K, KeyLock>,
{
    /// Creates an empty lock map over a custom [`MapLike`] store.
    pub fn with_store(store: S) -> Self {
        LockMap {
            locks: std::sync::Mutex::new(store),
            _key: PhantomData,
        }
    }

    /// Acquires the lock for `key`, creating it on first use.
    ///
    /// The returned guard is the release capability: dropping it releases
    /// the lock, exactly once.
    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            match locks.get(&key) {
                Some(lock) => Arc::clone(lock),
                None => {
                    tracing::trace!("creating lock for new key");
                    let lock = KeyLock::default();
                    locks.insert(key, Arc::clone(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Runs `body` while holding the lock for `key`.
    ///
    /// The lock is released on every exit path before `with` settles: normal
    /// return, error return, and cancellation by dropping the future. Errors
    /// returned by `body` propagate verbatim after the release.
    pub async fn with<T, F, Fut>(&self, key: K, body: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.acquire(key).await;
        body().await
    }

    /// The number of keys a lock has ever been created for.
    pub fn entry_count(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}
