//! Remote JSON document store access.
//!
//! The store is an opaque key-value tree addressed by slash-separated paths. It has
//! no transactions: every write replaces the document at one path, and concurrent
//! writers race with last-write-wins semantics.

mod http;
mod memory;

pub use http::HttpDocumentStore;
pub use memory::MemoryStore;
#[cfg(test)]
pub use memory::{StoreOp, StoreWrite};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Well-known document paths.
pub mod paths {
    /// Full catalog snapshot.
    pub const CATALOG: &str = "drugs";
    /// Last-modified marker for the catalog.
    pub const LAST_MODIFIED: &str = "drugs/updateDate";
    /// Parent of all backups, keyed by epoch milliseconds.
    pub const BACKUPS: &str = "backups";
    /// Parent of all audit log records, keyed by log id.
    pub const LOGS: &str = "logs";
    /// Parent of the site content pages.
    pub const PAGES: &str = "pages";

    pub fn backup(backup_id: &str) -> String {
        format!("{}/{}", BACKUPS, backup_id)
    }

    pub fn log(log_id: &str) -> String {
        format!("{}/{}", LOGS, log_id)
    }

    pub fn page(name: &str) -> String {
        format!("{}/{}", PAGES, name)
    }
}

/// Errors talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Transport(String),

    #[error("Store returned {status} {reason}")]
    Status { status: u16, reason: String },

    #[error("Store returned an unreadable body: {0}")]
    Decode(String),

    #[error("Store request timed out")]
    Timeout,
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// Path-addressed JSON document store.
///
/// Used as `Arc<dyn DocumentStore>`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the document at `path`. `None` when nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Overwrite the document at `path`. Writing `null` removes it.
    async fn put(&self, path: &str, value: &Value) -> Result<(), StoreError>;

    /// Remove the document at `path` and everything beneath it.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Keys of the direct children of `path`, in no particular order.
    async fn list_keys(&self, path: &str) -> Result<Vec<String>, StoreError>;

    /// The last `limit` children of `path` when ordered by their `order_by` field.
    ///
    /// Ordering and limiting are the store's; callers should not rely on the order
    /// of the returned object's entries.
    async fn query_last(
        &self,
        path: &str,
        order_by: &str,
        limit: usize,
    ) -> Result<Option<Value>, StoreError>;
}

/// Normalize a path to its slash-separated form without leading/trailing slashes.
pub(crate) fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
