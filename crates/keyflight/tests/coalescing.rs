use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use keyflight::{AsyncCache, CacheOptions, LockMap};
use thiserror::Error;

#[tokio::test(flavor = "multi_thread")]
async fn test_single_flight_across_tasks() -> Result<()> {
    keyflight::logging::init_logging("keyflight=trace");

    let calls = Arc::new(AtomicUsize::new(0));
    let cache = {
        let calls = Arc::clone(&calls);
        Arc::new(AsyncCache::new(move |key: String| {
            let calls = Arc::clone(&calls);
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(key.to_uppercase())
            }
        }))
    };

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(
            async move { cache.get("stats".to_owned()).await },
        ));
    }
    for handle in handles {
        assert_eq!(handle.await?.unwrap(), "STATS");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_expiry_with_real_clock() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = {
        let calls = Arc::clone(&calls);
        AsyncCache::with_options(
            move |_key: ()| {
                let calls = Arc::clone(&calls);
                async move { Ok::<_, Infallible>(calls.fetch_add(1, Ordering::SeqCst)) }
            },
            CacheOptions {
                max_age: Some(Duration::from_millis(80)),
            },
        )
    };

    assert_eq!(cache.get(()).await.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(cache.get(()).await.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cache.get(()).await.unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum FetchError {
    #[error("upstream unavailable")]
    Unavailable,
}

#[tokio::test]
async fn test_errors_propagate_and_retry() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let cache = {
        let attempts = Arc::clone(&attempts);
        AsyncCache::new(move |_key: u32| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(FetchError::Unavailable)
                } else {
                    Ok("payload")
                }
            }
        })
    };

    assert_eq!(cache.get(7).await, Err(FetchError::Unavailable));
    assert_eq!(cache.get(7).await, Ok("payload"));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mutual_exclusion_per_key() -> Result<()> {
    let locks = Arc::new(LockMap::<&str>::new());
    let running = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let locks = Arc::clone(&locks);
        let running = Arc::clone(&running);
        handles.push(tokio::spawn(async move {
            let running = Arc::clone(&running);
            locks
                .with("shared", move || async move {
                    assert_eq!(running.fetch_add(1, Ordering::SeqCst), 0);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await;
        }));
    }
    for handle in handles {
        handle.await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_distinct_keys_overlap() {
    let locks = LockMap::<&str>::new();
    let barrier = tokio::sync::Barrier::new(2);
    let (left, right) = (&barrier, &barrier);

    // both bodies must be inside their critical sections at the same time
    // for the barrier to release
    tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(
            locks.with("left", move || async move {
                left.wait().await;
            }),
            locks.with("right", move || async move {
                right.wait().await;
            }),
        )
    })
    .await
    .expect("different keys blocked each other");
}

#[tokio::test]
async fn test_release_on_cancellation() {
    let locks = LockMap::<&str>::new();

    // cancel a body mid-flight by dropping its future
    let cancelled = tokio::time::timeout(
        Duration::from_millis(10),
        locks.with("key", || std::future::pending::<()>()),
    )
    .await;
    assert!(cancelled.is_err());

    tokio::time::timeout(Duration::from_millis(100), locks.with("key", || async {}))
        .await
        .expect("lock was left held after cancellation");
}

#[tokio::test]
async fn test_cache_guarded_by_locks() -> Result<()> {
    // a factory that refuses to run concurrently with the maintenance
    // section guarding the same resource
    let locks = Arc::new(LockMap::<String>::new());
    let cache = {
        let locks = Arc::clone(&locks);
        AsyncCache::new(move |key: String| {
            let locks = Arc::clone(&locks);
            async move {
                locks
                    .with(key.clone(), move || async move {
                        Ok::<_, Infallible>(format!("loaded {key}"))
                    })
                    .await
            }
        })
    };

    let _guard = locks.acquire("users".to_owned()).await;
    let pending = tokio::time::timeout(Duration::from_millis(10), cache.get("users".to_owned()));
    assert!(pending.await.is_err());
    drop(_guard);

    assert_eq!(cache.get("users".to_owned()).await.unwrap(), "loaded users");
    Ok(())
}
