//! Audit log model.

use serde::{Deserialize, Serialize};

/// Kinds of audited data-management actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAction {
    ImportFromFile,
    ImportFromUrl,
    DeleteAllData,
    RestoreData,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::ImportFromFile => "import_from_file",
            LogAction::ImportFromUrl => "import_from_url",
            LogAction::DeleteAllData => "delete_all_data",
            LogAction::RestoreData => "restore_data",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "import_from_file" => Some(LogAction::ImportFromFile),
            "import_from_url" => Some(LogAction::ImportFromUrl),
            "delete_all_data" => Some(LogAction::DeleteAllData),
            "restore_data" => Some(LogAction::RestoreData),
            _ => None,
        }
    }
}

/// Immutable audit record.
///
/// `action` stays a plain string so records written by other tools still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub timestamp: i64,
    pub action: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub admin_email: String,
}

impl LogEntry {
    /// The known action kind, if any.
    pub fn kind(&self) -> Option<LogAction> {
        LogAction::from_str(&self.action)
    }
}
