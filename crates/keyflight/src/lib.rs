//! Single-flight async caching and keyed locking primitives.
//!
//! These primitives can be composed and layered on top of each other.
//!
//! [`AsyncCache`] does request coalescing: concurrent and repeated invocations
//! of an expensive async factory share a single computation per key, with
//! optional time-based expiry checked lazily on access. [`LockMap`] scopes
//! critical sections to a key, so that two callers presenting the same key
//! never run their bodies concurrently while different keys proceed in
//! parallel. [`memoize()`] composes [`AsyncCache`] with a canonical-JSON key
//! adapter to turn an arbitrary async function into a cached one.
//!
//! Both components delegate their bookkeeping to a pluggable [`MapLike`]
//! store; [`MapAdapter`] lets key types without a native [`std::hash::Hash`]
//! be adapted onto one.

#![warn(missing_docs)]

mod cache;
mod lock;
mod map;
mod memoize;

pub mod error;
pub mod json;
pub mod logging;

pub use cache::*;
pub use lock::*;
pub use map::*;
pub use memoize::*;

#[cfg(any(test, feature = "test"))]
pub(crate) use tokio::time;

#[cfg(not(any(test, feature = "test")))]
pub(crate) use std::time;
