use std::future::Future;

use serde::Serialize;

use crate::cache::{AsyncCache, CacheOptions, CacheSlot};
use crate::json;
use crate::map::MapAdapter;

type MemoStore<A, V, E> = MapAdapter<A, CacheSlot<V, E>, String>;

/// A memoized async function, as returned by [`memoize()`].
pub struct Memoized<A, V, E> {
    cache: AsyncCache<A, V, E, MemoStore<A, V, E>>,
}

/// Memoizes an async function.
///
/// The cache key is the canonical JSON rendering of the argument value, so
/// arguments that are structurally equal share an entry even when they are
/// distinct values. Arguments must serialize deterministically; an argument
/// that fails to serialize is a caller contract violation and panics.
pub fn memoize<A, V, E, F, Fut>(func: F) -> Memoized<A, V, E>
where
    A: Serialize + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
{
    memoize_with_options(func, CacheOptions::default())
}

/// Memoizes an async function with the given cache configuration.
pub fn memoize_with_options<A, V, E, F, Fut>(func: F, options: CacheOptions) -> Memoized<A, V, E>
where
    A: Serialize + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
{
    let store = MapAdapter::new(|args: &A| {
        json::stable_string(args).expect("memoized arguments must serialize to JSON")
    });
    Memoized {
        cache: AsyncCache::with_store(func, options, store),
    }
}

impl<A, V, E> Memoized<A, V, E>
where
    A: Serialize + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Calls the memoized function, or returns the cached outcome for
    /// structurally equal arguments.
    pub async fn get(&self, args: A) -> Result<V, E> {
        self.cache.get(args).await
    }

    /// Discards all cached outcomes.
    pub fn clear(&self) {
        self.cache.clear();
    }
}
