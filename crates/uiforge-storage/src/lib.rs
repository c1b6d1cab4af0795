// Thread storage
//
// This crate provides the SessionStore trait and its in-memory implementation:
// - ThreadRecord: values, metadata, status and checkpoint of one thread
// - History: checkpoint snapshots chained by parent
// - Run lock: at most one run per thread at a time

pub mod error;
pub mod models;
pub mod session_store;

pub use error::{Result, StoreError};
pub use models::*;
pub use session_store::{InMemorySessionStore, RunGuard, SessionStore};
