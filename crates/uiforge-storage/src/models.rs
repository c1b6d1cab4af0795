// Thread models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uiforge_core::{ScaffoldState, SessionState};

/// Checkpoint namespace used for every checkpoint this store records
pub const CHECKPOINT_NS: &str = "inmemory";

/// Snapshots kept per thread; the oldest are dropped first
pub const MAX_HISTORY_ENTRIES: usize = 50;

/// Free-form thread metadata (shallow-merged on update)
pub type ThreadMetadata = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    Idle,
    Running,
    Completed,
}

/// Typed values of a thread; the shape depends on which pipeline ran on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThreadValues {
    Supervisor(Box<SessionState>),
    Linear(Box<ScaffoldState>),
}

impl ThreadValues {
    pub fn as_supervisor(&self) -> Option<&SessionState> {
        match self {
            ThreadValues::Supervisor(state) => Some(state),
            ThreadValues::Linear(_) => None,
        }
    }

    pub fn as_linear(&self) -> Option<&ScaffoldState> {
        match self {
            ThreadValues::Linear(state) => Some(state),
            ThreadValues::Supervisor(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

impl From<SessionState> for ThreadValues {
    fn from(state: SessionState) -> Self {
        ThreadValues::Supervisor(Box::new(state))
    }
}

impl From<ScaffoldState> for ThreadValues {
    fn from(state: ScaffoldState) -> Self {
        ThreadValues::Linear(Box::new(state))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_id: String,
    pub checkpoint_ns: String,
}

impl Checkpoint {
    pub fn new(checkpoint_id: impl Into<String>) -> Self {
        Self {
            checkpoint_id: checkpoint_id.into(),
            checkpoint_ns: CHECKPOINT_NS.to_string(),
        }
    }
}

/// One persisted thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub thread_id: String,
    pub metadata: ThreadMetadata,
    /// None until a run or a state update writes values
    pub values: Option<ThreadValues>,
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub checkpoint: Option<Checkpoint>,
}

impl ThreadRecord {
    pub fn new(thread_id: impl Into<String>, metadata: Option<ThreadMetadata>) -> Self {
        let now = Utc::now();
        let mut merged = ThreadMetadata::new();
        merged.insert("writes".to_string(), Value::Object(Map::new()));
        merged.extend(metadata.unwrap_or_default());

        Self {
            thread_id: thread_id.into(),
            metadata: merged,
            values: None,
            status: ThreadStatus::Idle,
            created_at: now,
            updated_at: now,
            checkpoint: None,
        }
    }

    /// Values as JSON, `{}` for a thread that has none yet
    pub fn values_json(&self) -> Value {
        self.values
            .as_ref()
            .map(ThreadValues::to_json)
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

/// A checkpoint snapshot of a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub checkpoint: Checkpoint,
    pub parent_checkpoint: Option<Checkpoint>,
    pub values: Option<ThreadValues>,
    pub metadata: ThreadMetadata,
    pub created_at: DateTime<Utc>,
}
