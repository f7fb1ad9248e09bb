//! at-most-once application of mutating requests
//!
//! the first caller for a key runs the operation; concurrent and later
//! callers with the same key wait for and receive the same result

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;

pub struct IdempotencyCache<K, V> {
    entries: Mutex<HashMap<K, (Instant, Arc<OnceCell<V>>)>>,
}

impl<K, V> IdempotencyCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_compute<F, Fut>(&self, key: K, operation: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(key)
                .or_insert_with(|| (Instant::now(), Arc::new(OnceCell::new())))
                .1
                .clone()
        };
        cell.get_or_init(operation).await.clone()
    }

    /// drop entries older than `ttl`
    pub async fn purge(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, (created, _)| now.duration_since(*created) < ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl<K, V> Default for IdempotencyCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_applies_once() {
        let cache: IdempotencyCache<&str, Result<u32, String>> = IdempotencyCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let result = cache
                .get_or_compute("register", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>("round full".to_string())
                })
                .await;
            assert_eq!(result, Err("round full".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_result() {
        let cache = Arc::new(IdempotencyCache::<u8, u64>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_compute(1, || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            42
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge() {
        let cache = IdempotencyCache::<u8, u8>::new();
        cache.get_or_compute(1, || async { 1 }).await;
        tokio::time::advance(Duration::from_secs(10)).await;
        cache.get_or_compute(2, || async { 2 }).await;

        assert_eq!(cache.purge(Duration::from_secs(5)).await, 1);
        assert_eq!(cache.len().await, 1);
    }
}
