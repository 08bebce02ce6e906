//! Coarse process-wide lock guarding the deposit scan.

use crate::db::Repository;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct GlobalLock {
    repo: Arc<Repository>,
    attempts: u32,
    retry_delay: Duration,
}

impl GlobalLock {
    pub fn new(repo: Arc<Repository>, attempts: u32, retry_delay: Duration) -> Self {
        Self {
            repo,
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    /// Try to take the lock, waiting `retry_delay` between attempts.
    ///
    /// Contention is not an error: `Ok(false)` means every attempt found the
    /// lock held.
    pub async fn acquire(&self) -> Result<bool, sqlx::Error> {
        for attempt in 1..=self.attempts {
            if self.repo.try_acquire_global_lock().await? {
                debug!(attempt, "Global lock acquired");
                return Ok(true);
            }
            if attempt < self.attempts {
                warn!(attempt, "Global lock busy, retrying");
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        warn!(attempts = self.attempts, "Global lock not acquired");
        Ok(false)
    }

    /// Clear the lock unconditionally.
    pub async fn release(&self) -> Result<(), sqlx::Error> {
        self.repo.release_global_lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_db;

    #[tokio::test]
    async fn test_acquire_gives_up_when_held() {
        let (repo, _temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let first = GlobalLock::new(repo.clone(), 3, Duration::from_millis(1));
        let second = GlobalLock::new(repo.clone(), 2, Duration::from_millis(1));

        assert!(first.acquire().await.unwrap());
        assert!(!second.acquire().await.unwrap());

        first.release().await.unwrap();
        assert!(second.acquire().await.unwrap());
    }

    #[tokio::test]
    async fn test_release_is_unconditional() {
        let (repo, _temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let holder = GlobalLock::new(repo.clone(), 1, Duration::ZERO);
        let other = GlobalLock::new(repo.clone(), 1, Duration::ZERO);

        assert!(holder.acquire().await.unwrap());
        other.release().await.unwrap();
        assert!(!repo.global_lock_held().await.unwrap());
    }
}
