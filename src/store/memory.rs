//! In-process document store used in dev mode and tests.
//!
//! Each written path holds its own document. Reading a path returns the document
//! written at exactly that path; when there is none, the documents written beneath
//! it are assembled into an object keyed by child segment. Writing a path replaces
//! its whole subtree.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{normalize_path, DocumentStore, StoreError};

/// Store operation kinds, used for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Put,
    Delete,
    ListKeys,
    Query,
}

/// A recorded mutation.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    Put { path: String, value: Value },
    Delete { path: String },
}

#[cfg(test)]
impl StoreWrite {
    pub fn path(&self) -> &str {
        match self {
            StoreWrite::Put { path, .. } | StoreWrite::Delete { path } => path,
        }
    }
}

/// Document store held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, Value>>,
    failures: RwLock<HashSet<(StoreOp, String)>>,
    #[cfg(test)]
    writes: RwLock<Vec<StoreWrite>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `op` against `path` fail with a 503 until cleared.
    #[cfg(test)]
    pub async fn fail_on(&self, op: StoreOp, path: &str) {
        self.failures
            .write()
            .await
            .insert((op, normalize_path(path)));
    }

    #[cfg(test)]
    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    /// All mutations applied so far, oldest first.
    #[cfg(test)]
    pub async fn writes(&self) -> Vec<StoreWrite> {
        self.writes.read().await.clone()
    }

    async fn check(&self, op: StoreOp, path: &str) -> Result<(), StoreError> {
        if self
            .failures
            .read()
            .await
            .contains(&(op, path.to_string()))
        {
            return Err(StoreError::Status {
                status: 503,
                reason: "Service Unavailable".to_string(),
            });
        }
        Ok(())
    }

    /// Read without failure injection.
    async fn read(&self, path: &str) -> Option<Value> {
        let documents = self.documents.read().await;
        if let Some(value) = documents.get(path) {
            return Some(value.clone());
        }

        let prefix = child_prefix(path);
        let mut assembled = Map::new();
        for (key, value) in documents.range(prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&prefix) else {
                break;
            };
            insert_nested(&mut assembled, rest, value.clone());
        }

        if assembled.is_empty() {
            None
        } else {
            Some(Value::Object(assembled))
        }
    }

    async fn remove(&self, path: &str) {
        let prefix = child_prefix(path);
        self.documents
            .write()
            .await
            .retain(|key, _| key != path && !key.starts_with(&prefix));
    }
}

fn child_prefix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{}/", path)
    }
}

fn insert_nested(target: &mut Map<String, Value>, relative: &str, value: Value) {
    match relative.split_once('/') {
        None => {
            target.insert(relative.to_string(), value);
        }
        Some((head, tail)) => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_nested(child, tail, value);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let path = normalize_path(path);
        self.check(StoreOp::Get, &path).await?;
        Ok(self.read(&path).await)
    }

    async fn put(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        let path = normalize_path(path);
        self.check(StoreOp::Put, &path).await?;

        self.remove(&path).await;
        if !value.is_null() {
            self.documents
                .write()
                .await
                .insert(path.clone(), value.clone());
        }

        #[cfg(test)]
        self.writes.write().await.push(StoreWrite::Put {
            path,
            value: value.clone(),
        });
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let path = normalize_path(path);
        self.check(StoreOp::Delete, &path).await?;
        self.remove(&path).await;
        #[cfg(test)]
        self.writes.write().await.push(StoreWrite::Delete { path });
        Ok(())
    }

    async fn list_keys(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let path = normalize_path(path);
        self.check(StoreOp::ListKeys, &path).await?;

        Ok(match self.read(&path).await {
            Some(Value::Object(map)) => map.into_iter().map(|(key, _)| key).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter(|(_, item)| !item.is_null())
                .map(|(index, _)| index.to_string())
                .collect(),
            _ => Vec::new(),
        })
    }

    async fn query_last(
        &self,
        path: &str,
        order_by: &str,
        limit: usize,
    ) -> Result<Option<Value>, StoreError> {
        let path = normalize_path(path);
        self.check(StoreOp::Query, &path).await?;

        let Some(Value::Object(children)) = self.read(&path).await else {
            return Ok(None);
        };

        let mut ordered: Vec<(String, Value)> = children.into_iter().collect();
        ordered.sort_by(|(_, a), (_, b)| {
            let a = a.get(order_by).and_then(Value::as_f64).unwrap_or(f64::MIN);
            let b = b.get(order_by).and_then(Value::as_f64).unwrap_or(f64::MIN);
            a.total_cmp(&b)
        });

        let skip = ordered.len().saturating_sub(limit);
        let last: Map<String, Value> = ordered.into_iter().skip(skip).collect();
        Ok(Some(Value::Object(last)))
    }
}
