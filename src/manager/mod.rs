//! Catalog data management: import, export, backup, restore and the audit log.
//!
//! Every operation is a linear sequence of document store calls with no retries and
//! no rollback. Writes replace the whole catalog snapshot, so two admins importing or
//! restoring at the same time race and the last write wins.

mod validation;

pub use validation::{coerce_number, is_truthy, validate_rows, ValidatedRows};

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::Value;

use crate::clock::Clock;
use crate::errors::DataError;
use crate::models::{ImportResult, LogAction, LogEntry};
use crate::store::{paths, DocumentStore, StoreError};

/// Upper bound on audit records returned by [`DataManager::get_logs`].
pub const LOG_LIMIT: usize = 100;

/// Where an import payload came from.
#[derive(Debug, Clone, Copy)]
pub enum ImportSource<'a> {
    File { name: &'a str },
    Url { url: &'a str },
}

impl ImportSource<'_> {
    fn action(&self) -> LogAction {
        match self {
            ImportSource::File { .. } => LogAction::ImportFromFile,
            ImportSource::Url { .. } => LogAction::ImportFromUrl,
        }
    }

    fn invalid_format_message(&self) -> &'static str {
        match self {
            ImportSource::File { .. } => "Invalid JSON format in file",
            ImportSource::Url { .. } => "Invalid JSON format in URL data",
        }
    }

    fn invalid_shape_message(&self) -> &'static str {
        match self {
            ImportSource::File { .. } => "File must contain an array of drug objects",
            ImportSource::Url { .. } => "URL must return an array of drug objects",
        }
    }

    fn no_valid_rows_message(&self) -> &'static str {
        match self {
            ImportSource::File { .. } => "No valid drugs found in file",
            ImportSource::Url { .. } => "No valid drugs found in URL data",
        }
    }

    fn failure_prefix(&self) -> &'static str {
        match self {
            ImportSource::File { .. } => "Import failed",
            ImportSource::Url { .. } => "Import from URL failed",
        }
    }

    fn success_message(&self, count: usize) -> String {
        match self {
            ImportSource::File { .. } => format!("Successfully imported {} drugs", count),
            ImportSource::Url { .. } => {
                format!("Successfully imported {} drugs from URL", count)
            }
        }
    }

    fn log_details(&self, count: usize) -> String {
        match self {
            ImportSource::File { name } => {
                format!("Imported {} drugs from file: {}", count, name)
            }
            ImportSource::Url { url } => format!("Imported {} drugs from URL: {}", count, url),
        }
    }
}

/// Stateless facade over the document store for bulk catalog changes.
pub struct DataManager {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    http: reqwest::Client,
}

impl DataManager {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_http_client(store, clock, reqwest::Client::new())
    }

    pub fn with_http_client(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        http: reqwest::Client,
    ) -> Self {
        Self { store, clock, http }
    }

    // ==================== IMPORT ====================

    /// Import the contents of an uploaded file, replacing the whole catalog.
    pub async fn import_from_file(
        &self,
        file_name: &str,
        contents: &[u8],
        admin_email: &str,
    ) -> ImportResult {
        self.import_payload(ImportSource::File { name: file_name }, contents, admin_email)
            .await
    }

    /// Fetch `url` and import the response body, replacing the whole catalog.
    pub async fn import_from_url(&self, url: &str, admin_email: &str) -> ImportResult {
        let source = ImportSource::Url { url };

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Import from URL error: {}", e);
                return ImportResult::failed(format!("{}: {}", source.failure_prefix(), e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Import source {} answered {}", url, status);
            return ImportResult::failed(format!(
                "{}: Failed to fetch data: {}",
                source.failure_prefix(),
                status
            ));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Import from URL error: {}", e);
                return ImportResult::failed(format!("{}: {}", source.failure_prefix(), e));
            }
        };

        self.import_payload(source, &body, admin_email).await
    }

    async fn import_payload(
        &self,
        source: ImportSource<'_>,
        payload: &[u8],
        admin_email: &str,
    ) -> ImportResult {
        let data: Value = match serde_json::from_slice(payload) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Rejected import payload: {}", e);
                return ImportResult::failed(source.invalid_format_message());
            }
        };

        let rows = match data.as_array() {
            Some(rows) if !rows.is_empty() => rows,
            _ => return ImportResult::failed(source.invalid_shape_message()),
        };

        let ValidatedRows { drugs, errors } =
            validate_rows(rows, self.clock.now_millis(), &self.clock.today());

        if drugs.is_empty() {
            return ImportResult::failed_with_errors(source.no_valid_rows_message(), errors);
        }

        let count = drugs.len();
        let snapshot = match serde_json::to_value(&drugs) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Failed to serialize catalog: {}", e);
                return ImportResult::failed(format!("{}: {}", source.failure_prefix(), e));
            }
        };

        if let Err(e) = self.store.put(paths::CATALOG, &snapshot).await {
            tracing::error!("Import error: {}", e);
            return ImportResult::failed(format!(
                "{}: Failed to save catalog: {}",
                source.failure_prefix(),
                e
            ));
        }

        self.touch_last_modified().await;
        self.log_action(admin_email, source.action(), &source.log_details(count))
            .await;

        tracing::info!(
            "Imported {} drugs ({} rows rejected) by {}",
            count,
            errors.len(),
            admin_email
        );

        ImportResult::imported(count, source.success_message(count), errors)
    }

    /// Stamp the catalog's last-modified marker. Best effort.
    async fn touch_last_modified(&self) {
        let stamp = Value::String(self.clock.now_iso());
        if let Err(e) = self.store.put(paths::LAST_MODIFIED, &stamp).await {
            tracing::warn!("Failed to update last-modified marker: {}", e);
        }
    }

    // ==================== EXPORT / BACKUP ====================

    async fn read_snapshot(&self) -> Result<Value, DataError> {
        self.store
            .get(paths::CATALOG)
            .await
            .map(|snapshot| snapshot.unwrap_or(Value::Null))
            .map_err(DataError::Export)
    }

    /// Current catalog snapshot as pretty-printed JSON, verbatim.
    ///
    /// Unlike the other operations, a store failure is returned to the caller.
    pub async fn export_data(&self) -> Result<String, DataError> {
        let snapshot = self.read_snapshot().await.inspect_err(|e| {
            tracing::error!("Export error: {}", e);
        })?;

        serde_json::to_string_pretty(&snapshot)
            .map_err(|e| DataError::Export(StoreError::Decode(e.to_string())))
    }

    /// Back up the catalog, then delete it. Returns the id of the new backup.
    ///
    /// Nothing is deleted unless the backup was written. A failed delete after a
    /// successful backup leaves that backup behind.
    pub async fn delete_all_data(&self, admin_email: &str) -> Result<String, DataError> {
        let result = self.backup_then_delete(admin_email).await;
        if let Err(e) = &result {
            tracing::error!("Delete all data error: {}", e);
        }
        result
    }

    async fn backup_then_delete(&self, admin_email: &str) -> Result<String, DataError> {
        let snapshot = self.read_snapshot().await?;

        let backup_id = self.clock.now_millis().to_string();
        self.store
            .put(&paths::backup(&backup_id), &snapshot)
            .await
            .map_err(|source| DataError::Backup {
                backup_id: backup_id.clone(),
                source,
            })?;

        self.store
            .delete(paths::CATALOG)
            .await
            .map_err(DataError::Delete)?;

        self.log_action(admin_email, LogAction::DeleteAllData, "Deleted all drug data")
            .await;

        tracing::info!("Catalog deleted by {}, backup {}", admin_email, backup_id);
        Ok(backup_id)
    }

    /// Overwrite the catalog with the content of a backup.
    ///
    /// The current catalog is not backed up first.
    pub async fn restore_data(&self, backup_id: &str, admin_email: &str) -> Result<(), DataError> {
        let result = self.restore_from(backup_id, admin_email).await;
        if let Err(e) = &result {
            tracing::error!("Restore data error: {}", e);
        }
        result
    }

    async fn restore_from(&self, backup_id: &str, admin_email: &str) -> Result<(), DataError> {
        if backup_id.is_empty() || !backup_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(DataError::InvalidBackupId(backup_id.to_string()));
        }

        let backup = self
            .store
            .get(&paths::backup(backup_id))
            .await
            .map_err(|source| DataError::BackupRead {
                backup_id: backup_id.to_string(),
                source,
            })?
            .ok_or_else(|| DataError::BackupNotFound(backup_id.to_string()))?;

        self.store
            .put(paths::CATALOG, &backup)
            .await
            .map_err(DataError::Restore)?;

        self.log_action(
            admin_email,
            LogAction::RestoreData,
            &format!("Restored data from backup: {}", backup_id),
        )
        .await;

        tracing::info!("Catalog restored from backup {} by {}", backup_id, admin_email);
        Ok(())
    }

    /// Backup ids, newest first. Empty when the backups cannot be read.
    pub async fn list_backups(&self) -> Vec<String> {
        let mut keys = match self.store.list_keys(paths::BACKUPS).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Get backups error: {}", e);
                return Vec::new();
            }
        };

        keys.sort_by(|a, b| compare_backup_ids(b, a));
        keys
    }

    // ==================== AUDIT LOG ====================

    /// Append one audit record. Failures are logged and swallowed.
    pub async fn log_action(&self, admin_email: &str, action: LogAction, details: &str) {
        let timestamp = self.clock.now_millis();
        let entry = LogEntry {
            id: format!("log_{}", timestamp),
            timestamp,
            action: action.as_str().to_string(),
            details: details.to_string(),
            admin_email: admin_email.to_string(),
        };

        let value = match serde_json::to_value(&entry) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Log action error: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.put(&paths::log(&entry.id), &value).await {
            tracing::warn!("Log action error: {}", e);
        }
    }

    /// The most recent audit records, newest first. Empty when they cannot be read.
    pub async fn get_logs(&self) -> Vec<LogEntry> {
        let data = match self
            .store
            .query_last(paths::LOGS, "timestamp", LOG_LIMIT)
            .await
        {
            Ok(Some(data)) => data,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Get logs error: {}", e);
                return Vec::new();
            }
        };

        let records: Vec<Value> = match data {
            Value::Object(map) => map.into_iter().map(|(_, record)| record).collect(),
            Value::Array(items) => items,
            _ => Vec::new(),
        };

        let mut logs: Vec<LogEntry> = records
            .into_iter()
            .filter(|record| !record.is_null())
            .filter_map(|record| match serde_json::from_value::<LogEntry>(record) {
                Ok(entry) => {
                    if entry.kind().is_none() {
                        tracing::debug!("Log {} has unknown action '{}'", entry.id, entry.action);
                    }
                    Some(entry)
                }
                Err(e) => {
                    tracing::debug!("Skipping malformed log record: {}", e);
                    None
                }
            })
            .collect();

        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        logs
    }
}

/// Numeric order for backup ids; non-numeric ids sort below all numeric ones.
fn compare_backup_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
