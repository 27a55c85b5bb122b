//! Import result and data-management request bodies.

use serde::{Deserialize, Serialize};

/// Outcome of an import, returned to the admin panel for display.
///
/// A partial import (some rows dropped) is still a success as long as one row
/// survived; the dropped rows are listed in `errors`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl ImportResult {
    pub fn imported(count: usize, message: String, errors: Vec<String>) -> Self {
        Self {
            success: true,
            message,
            imported_count: Some(count),
            errors: (!errors.is_empty()).then_some(errors),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            imported_count: None,
            errors: None,
        }
    }

    pub fn failed_with_errors(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            errors: Some(errors),
            ..Self::failed(message)
        }
    }
}

/// Request body for importing from a URL.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportUrlRequest {
    pub url: String,
}

/// Query parameters for importing an uploaded file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFileQuery {
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

fn default_file_name() -> String {
    "upload.json".to_string()
}

/// Request body for restoring a backup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    pub backup_id: String,
}

/// Result of a delete-all operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllResponse {
    pub backup_id: String,
}

/// Result of a restore operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResponse {
    pub restored_from: String,
}
