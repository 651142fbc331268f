//! Server-side diary storage.
//!
//! Each diary is a [`LocalDiary`] directory named after its key under the
//! storage root. Requests for the same key are serialized with an async lock
//! and the file work runs on the blocking pool.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use blurg_core::{EntryStore, LocalDiary};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::AppError;

#[derive(Clone)]
pub struct DiaryStore {
    root: PathBuf,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl DiaryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create the diary for `key` unless it already exists. Returns whether
    /// it was created.
    pub async fn init(&self, key: &str) -> Result<bool, AppError> {
        let _guard = self.lock(key).await;
        let diary = self.diary(key);
        run_blocking(move || {
            if diary.exists() {
                return Ok(false);
            }
            LocalDiary::create(diary.name(), diary.path()).map(|_| true)
        })
        .await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let _guard = self.lock(key).await;
        let diary = self.diary(key);
        run_blocking(move || Ok(diary.exists())).await
    }

    /// Run `operation` against the diary for `key`, which must exist.
    pub async fn with_diary<T, F>(&self, key: &str, operation: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&LocalDiary) -> blurg_core::Result<T> + Send + 'static,
    {
        let _guard = self.lock(key).await;
        let diary = self.diary(key);
        run_blocking(move || {
            if !diary.exists() {
                return Ok(Err(AppError::NoDiary));
            }
            operation(&diary).map(Ok)
        })
        .await?
    }

    pub async fn wipe(&self, key: &str) -> Result<(), AppError> {
        self.with_diary(key, |diary| diary.delete()).await
    }

    fn diary(&self, key: &str) -> LocalDiary {
        LocalDiary::new(key, self.root.join(key))
    }

    async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries nobody holds or waits on are dropped.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> blurg_core::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|error| AppError::internal(format!("storage task failed: {error}")))?
        .map_err(AppError::from)
}
