//! Document store client speaking the realtime-database REST dialect.
//!
//! Every path is addressed as `{base}/{path}.json`. A `null` body means the path
//! holds nothing.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

use super::{normalize_path, DocumentStore, StoreError};

/// HTTP-backed document store.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, normalize_path(path))
    }

    async fn read_body(response: Response) -> Result<Option<Value>, StoreError> {
        let value: Value = ensure_success(response)?.json().await?;
        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }
}

/// Map a non-2xx response to a status error.
fn ensure_success(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(StoreError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        })
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::read_body(response).await
    }

    async fn put(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        let response = self.client.put(self.url(path)).json(value).send().await?;
        ensure_success(response)?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let response = self.client.delete(self.url(path)).send().await?;
        ensure_success(response)?;
        Ok(())
    }

    async fn list_keys(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let response = self
            .client
            .get(self.url(path))
            .query(&[("shallow", "true")])
            .send()
            .await?;

        Ok(match Self::read_body(response).await? {
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
        let order_by = format!("\"{}\"", order_by);
        let limit = limit.to_string();
        let response = self
            .client
            .get(self.url(path))
            .query(&[("orderBy", order_by.as_str()), ("limitToLast", limit.as_str())])
            .send()
            .await?;
        Self::read_body(response).await
    }
}
