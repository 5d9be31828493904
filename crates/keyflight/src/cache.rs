use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Deserialize;

use crate::map::MapLike;
use crate::time::Instant;

/// Configuration for [`AsyncCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Maximum duration since computation of a cached value (item age).
    ///
    /// Expired values are dropped lazily when they are accessed; there is no
    /// background sweep. `None` keeps values indefinitely.
    #[serde(with = "humantime_serde")]
    pub max_age: Option<Duration>,
}

/// The in-flight computation for a key, shared between all callers racing on
/// that key.
type SharedComputation<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

type Factory<K, V, E> = Arc<dyn Fn(K) -> BoxFuture<'static, Result<V, E>> + Send + Sync>;

/// A cache slot: either the single in-flight computation for a key, or the
/// value it resolved to and when.
pub struct CacheSlot<V, E>(SlotState<V, E>);

enum SlotState<V, E> {
    Pending {
        /// Tags the pending computation so a write-back can tell whether the
        /// slot was displaced (by [`AsyncCache::clear`] or by a newer
        /// computation) while it was in flight.
        generation: u64,
        computation: SharedComputation<V, E>,
    },
    Resolved {
        computed_at: Instant,
        value: V,
    },
}

struct State<S> {
    slots: S,
    generation: u64,
}

/// An in-memory cache for async computations.
///
/// Does request coalescing: all callers of [`get`](Self::get) racing on the
/// same key during its pending window share one factory invocation and
/// observe its outcome together. Successful values are kept until they
/// expire per [`CacheOptions::max_age`], checked lazily on access. Failures
/// are never cached; the next call for that key starts a fresh attempt.
///
/// The bookkeeping is delegated to a [`MapLike`] store, so key types without
/// a native [`Hash`] can be supported through
/// [`MapAdapter`](crate::MapAdapter) and [`with_store`](Self::with_store).
pub struct AsyncCache<K, V, E, S = HashMap<K, CacheSlot<V, E>>> {
    factory: Factory<K, V, E>,
    options: CacheOptions,
    state: Arc<Mutex<State<S>>>,
}

impl<K, V, E, S> Clone for AsyncCache<K, V, E, S> {
    fn clone(&self) -> Self {
        AsyncCache {
            factory: Arc::clone(&self.factory),
            options: self.options,
            state: Arc::clone(&self.state),
        }
    }
}

impl<K, V, E, S> fmt::Debug for AsyncCache<K, V, E, S>
where
    S: MapLike<K, CacheSlot<V, E>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .state
            .try_lock()
            .map(|state| state.slots.len())
            .unwrap_or_default();
        f.debug_struct("AsyncCache")
            .field("options", &self.options)
            .field("entries", &entries)
            .finish()
    }
}

impl<K, V, E> AsyncCache<K, V, E>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates a cache over the default [`HashMap`] store, keeping values
    /// indefinitely.
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        Self::with_options(factory, CacheOptions::default())
    }

    /// Creates a cache over the default [`HashMap`] store.
    pub fn with_options<F, Fut>(factory: F, options: CacheOptions) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        Self::with_store(factory, options, HashMap::new())
    }
}

impl<K, V, E, S> AsyncCache<K, V, E, S>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    S: MapLike<K, CacheSlot<V, E>> + Send + 'static,
{
    /// Creates a cache over a custom [`MapLike`] store.
    pub fn with_store<F, Fut>(factory: F, options: CacheOptions, store: S) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let factory = Arc::new(factory);
        let factory: Factory<K, V, E> = Arc::new(move |key| {
            let factory = Arc::clone(&factory);
            // deferred into the future so that the factory body never runs
            // under the state lock
            async move { factory(key).await }.boxed()
        });

        AsyncCache {
            factory,
            options,
            state: Arc::new(Mutex::new(State {
                slots: store,
                generation: 0,
            })),
        }
    }

    /// Gets or computes the value for `key`.
    ///
    /// The computation is deduplicated between concurrent callers: the
    /// factory runs at most once per key per pending window, and every
    /// caller of that window observes the same outcome. Errors propagate
    /// verbatim and are not retained.
    pub async fn get(&self, key: K) -> Result<V, E> {
        let computation = {
            let mut state = self.state.lock().unwrap();

            let expired = match state.slots.get(&key) {
                Some(CacheSlot(SlotState::Resolved { computed_at, .. })) => self
                    .options
                    .max_age
                    .is_some_and(|max_age| computed_at.elapsed() > max_age),
                _ => false,
            };
            if expired {
                tracing::trace!("dropping expired cache entry");
                state.slots.remove(&key);
            }

            match state.slots.get(&key) {
                Some(CacheSlot(SlotState::Resolved { value, .. })) => return Ok(value.clone()),
                Some(CacheSlot(SlotState::Pending { computation, .. })) => {
                    tracing::trace!("coalescing onto in-flight computation");
                    computation.clone()
                }
                None => self.start_computation(&mut state, key),
            }
        };

        computation.await
    }

    /// Discards all entries, in-flight computations included.
    ///
    /// Callers already awaiting a pending computation still observe its
    /// outcome, but the result is not written back into the store.
    pub fn clear(&self) {
        self.state.lock().unwrap().slots.clear();
        tracing::debug!("cache cleared");
    }

    /// The number of slots currently held, pending and resolved alike.
    pub fn entry_count(&self) -> usize {
        self.state.lock().unwrap().slots.len()
    }

    fn start_computation(&self, state: &mut State<S>, key: K) -> SharedComputation<V, E> {
        state.generation += 1;
        let generation = state.generation;

        tracing::trace!("starting new computation");

        let factory_future = (self.factory)(key.clone());
        let state_handle = Arc::clone(&self.state);
        let write_back_key = key.clone();

        let computation = async move {
            let result = factory_future.await;

            let mut state = state_handle.lock().unwrap();
            let still_current = matches!(
                state.slots.get(&write_back_key),
                Some(CacheSlot(SlotState::Pending { generation: current, .. }))
                    if *current == generation
            );
            if !still_current {
                // displaced by `clear()` or a newer computation; hand the
                // result to the waiters without writing it back
                return result;
            }

            match &result {
                Ok(value) => {
                    let slot = CacheSlot(SlotState::Resolved {
                        computed_at: Instant::now(),
                        value: value.clone(),
                    });
                    state.slots.insert(write_back_key, slot);
                }
                Err(_) => {
                    // failures are never cached; the next `get` starts over
                    tracing::debug!("computation failed, dropping its slot");
                    state.slots.remove(&write_back_key);
                }
            }

            result
        }
        .boxed()
        .shared();

        let slot = CacheSlot(SlotState::Pending {
            generation,
            computation: computation.clone(),
        });
        state.slots.insert(key, slot);

        computation
    }
}
