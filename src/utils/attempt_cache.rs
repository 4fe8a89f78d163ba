use std::time::Duration;

use moka::future::Cache;

/// Failed PIN attempts per name, forgotten after the lockout window.
pub struct AttemptCache {
    failures: Cache<String, u32>,
    max_attempts: u32,
}

impl AttemptCache {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            failures: Cache::builder()
                .max_capacity(50_000)
                .time_to_live(lockout)
                .build(),
            max_attempts,
        }
    }

    fn key(name: &str) -> String {
        name.trim().to_string()
    }

    /// True once `max_attempts` failures are on record. Zero disables the lock.
    pub async fn is_locked(&self, name: &str) -> bool {
        if self.max_attempts == 0 {
            return false;
        }
        self.failures
            .get(&Self::key(name))
            .await
            .is_some_and(|count| count >= self.max_attempts)
    }

    /// Records a failure and returns the running count.
    pub async fn record_failure(&self, name: &str) -> u32 {
        let entry = self
            .failures
            .entry(Self::key(name))
            .and_upsert_with(|current| async move {
                current.map(|e| e.into_value() + 1).unwrap_or(1)
            })
            .await;
        let count = entry.into_value();
        log::debug!("PIN failure {} recorded for name", count);
        count
    }

    pub async fn clear(&self, name: &str) {
        self.failures.invalidate(&Self::key(name)).await;
    }
}
