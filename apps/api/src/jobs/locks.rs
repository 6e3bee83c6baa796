use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// One async read/write lock per job title.
///
/// Registration, listing and report persistence take the shared side. Job
/// and candidate deletes take the exclusive side, so no candidate is attached
/// to a job and no report is written while a cascade runs.
#[derive(Clone, Default)]
pub struct JobLocks {
    locks: Arc<Mutex<HashMap<String, Arc<RwLock<()>>>>>,
}

impl JobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, job_title: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(job_title.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    pub async fn shared(&self, job_title: &str) -> OwnedRwLockReadGuard<()> {
        self.lock_for(job_title).read_owned().await
    }

    pub async fn exclusive(&self, job_title: &str) -> OwnedRwLockWriteGuard<()> {
        self.lock_for(job_title).write_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shared_holders_coexist() {
        let locks = JobLocks::new();
        let _a = locks.shared("Analyst").await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.shared("Analyst")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_exclusive_waits_for_shared() {
        let locks = JobLocks::new();
        let reader = locks.shared("Analyst").await;
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), locks.exclusive("Analyst")).await;
        assert!(blocked.is_err());

        drop(reader);
        let acquired =
            tokio::time::timeout(Duration::from_millis(50), locks.exclusive("Analyst")).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn test_titles_are_independent() {
        let locks = JobLocks::new();
        let _writer = locks.exclusive("Analyst").await;
        let other =
            tokio::time::timeout(Duration::from_millis(50), locks.exclusive("Engineer")).await;
        assert!(other.is_ok());
    }
}
