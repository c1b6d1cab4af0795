// SessionStore trait and in-memory implementation
//
// Every thread key owns its record, its checkpoint history and a run lock.
// Mutations touch only their own key; the outer map lock is held briefly.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::models::{
    Checkpoint, HistoryEntry, ThreadMetadata, ThreadRecord, ThreadStatus, ThreadValues,
    MAX_HISTORY_ENTRIES,
};

/// Held for the duration of one run; dropping it releases the thread
#[derive(Debug)]
pub struct RunGuard {
    thread_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl RunGuard {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }
}

/// Storage for thread records
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, thread_id: &str) -> Result<ThreadRecord>;

    /// Create a thread; returns the existing record unchanged if the id is taken
    async fn create(
        &self,
        thread_id: Option<String>,
        metadata: Option<ThreadMetadata>,
    ) -> Result<ThreadRecord>;

    async fn update_values(&self, thread_id: &str, values: ThreadValues) -> Result<ThreadRecord>;

    /// Shallow-merge metadata keys
    async fn update_metadata(
        &self,
        thread_id: &str,
        metadata: ThreadMetadata,
    ) -> Result<ThreadRecord>;

    async fn set_status(&self, thread_id: &str, status: ThreadStatus) -> Result<ThreadRecord>;

    async fn set_checkpoint(
        &self,
        thread_id: &str,
        checkpoint_id: Option<String>,
    ) -> Result<ThreadRecord>;

    /// Snapshot current values under `checkpoint_id`, chained to the previous entry
    async fn record_history(&self, thread_id: &str, checkpoint_id: &str) -> Result<()>;

    /// Recorded history, or a single synthetic entry when nothing was recorded
    async fn history(&self, thread_id: &str) -> Result<Vec<HistoryEntry>>;

    /// Claim the thread for a run; fails while another run holds it
    async fn acquire_run(&self, thread_id: &str) -> Result<RunGuard>;
}

// ============================================================================
// InMemorySessionStore
// ============================================================================

#[derive(Debug)]
struct ThreadEntry {
    record: ThreadRecord,
    history: Vec<HistoryEntry>,
    run_lock: Arc<Mutex<()>>,
}

/// In-memory session store
///
/// Stores threads in a HashMap keyed by thread id.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionStore {
    threads: Arc<RwLock<HashMap<String, ThreadEntry>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All thread ids
    pub async fn thread_ids(&self) -> Vec<String> {
        self.threads.read().await.keys().cloned().collect()
    }

    async fn modify(
        &self,
        thread_id: &str,
        f: impl FnOnce(&mut ThreadRecord) + Send,
    ) -> Result<ThreadRecord> {
        let mut threads = self.threads.write().await;
        let entry = threads
            .get_mut(thread_id)
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))?;
        f(&mut entry.record);
        entry.record.updated_at = Utc::now();
        Ok(entry.record.clone())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, thread_id: &str) -> Result<ThreadRecord> {
        self.threads
            .read()
            .await
            .get(thread_id)
            .map(|entry| entry.record.clone())
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))
    }

    async fn create(
        &self,
        thread_id: Option<String>,
        metadata: Option<ThreadMetadata>,
    ) -> Result<ThreadRecord> {
        let thread_id = thread_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::now_v7().to_string());

        let mut threads = self.threads.write().await;
        if let Some(entry) = threads.get(&thread_id) {
            return Ok(entry.record.clone());
        }

        let record = ThreadRecord::new(thread_id.clone(), metadata);
        tracing::debug!(thread_id = %thread_id, "Thread created");
        threads.insert(
            thread_id,
            ThreadEntry {
                record: record.clone(),
                history: Vec::new(),
                run_lock: Arc::new(Mutex::new(())),
            },
        );
        Ok(record)
    }

    async fn update_values(&self, thread_id: &str, values: ThreadValues) -> Result<ThreadRecord> {
        self.modify(thread_id, |record| record.values = Some(values))
            .await
    }

    async fn update_metadata(
        &self,
        thread_id: &str,
        metadata: ThreadMetadata,
    ) -> Result<ThreadRecord> {
        self.modify(thread_id, |record| record.metadata.extend(metadata))
            .await
    }

    async fn set_status(&self, thread_id: &str, status: ThreadStatus) -> Result<ThreadRecord> {
        self.modify(thread_id, |record| record.status = status).await
    }

    async fn set_checkpoint(
        &self,
        thread_id: &str,
        checkpoint_id: Option<String>,
    ) -> Result<ThreadRecord> {
        self.modify(thread_id, |record| {
            record.checkpoint = checkpoint_id.map(Checkpoint::new)
        })
        .await
    }

    async fn record_history(&self, thread_id: &str, checkpoint_id: &str) -> Result<()> {
        let mut threads = self.threads.write().await;
        let entry = threads
            .get_mut(thread_id)
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))?;

        let parent_checkpoint = entry.history.last().map(|last| last.checkpoint.clone());
        let snapshot = HistoryEntry {
            checkpoint: Checkpoint::new(checkpoint_id),
            parent_checkpoint,
            values: entry.record.values.clone(),
            metadata: entry.record.metadata.clone(),
            created_at: Utc::now(),
        };
        entry.history.push(snapshot);
        if entry.history.len() > MAX_HISTORY_ENTRIES {
            let excess = entry.history.len() - MAX_HISTORY_ENTRIES;
            entry.history.drain(..excess);
        }
        Ok(())
    }

    async fn history(&self, thread_id: &str) -> Result<Vec<HistoryEntry>> {
        let threads = self.threads.read().await;
        let entry = threads
            .get(thread_id)
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))?;

        if !entry.history.is_empty() {
            return Ok(entry.history.clone());
        }

        let record = &entry.record;
        let checkpoint = record.checkpoint.clone().unwrap_or_else(|| {
            Checkpoint::new(format!("{}-checkpoint", record.thread_id))
        });
        Ok(vec![HistoryEntry {
            checkpoint,
            parent_checkpoint: None,
            values: record.values.clone(),
            metadata: record.metadata.clone(),
            created_at: record.updated_at,
        }])
    }

    async fn acquire_run(&self, thread_id: &str) -> Result<RunGuard> {
        let lock = self
            .threads
            .read()
            .await
            .get(thread_id)
            .map(|entry| Arc::clone(&entry.run_lock))
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))?;

        let guard = lock
            .try_lock_owned()
            .map_err(|_| StoreError::RunInProgress(thread_id.to_string()))?;

        Ok(RunGuard {
            thread_id: thread_id.to_string(),
            _guard: guard,
        })
    }
}
