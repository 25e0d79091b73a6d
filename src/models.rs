//! # Reporting Models
//!
//! Values exchanged with the remote reporting service. The wire schema itself is
//! owned by the transport; these types only carry what the core reads or fills in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LaunchMode;

/// Issue type assigned to skipped items that should not count as issues
pub const NOT_ISSUE: &str = "NOT_ISSUE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemStatus {
    Passed,
    Failed,
    Stopped,
    Skipped,
    Interrupted,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Suite,
    Story,
    Test,
    Scenario,
    Step,
    BeforeClass,
    AfterClass,
    BeforeMethod,
    AfterMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartLaunchRq {
    pub name: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub mode: LaunchMode,
    pub attributes: Vec<String>,
}

impl StartLaunchRq {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            start_time: Utc::now(),
            mode: LaunchMode::Default,
            attributes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartLaunchRs {
    pub id: String,
    pub number: Option<u64>,
}

/// Finish request shared by finish-launch and stop-launch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishExecutionRq {
    pub end_time: DateTime<Utc>,
    pub status: Option<ItemStatus>,
}

impl FinishExecutionRq {
    pub fn now() -> Self {
        Self {
            end_time: Utc::now(),
            status: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTestItemRq {
    pub name: String,
    pub description: Option<String>,
    pub item_type: ItemType,
    pub start_time: DateTime<Utc>,
    /// Filled in by the scheduler once the launch id resolves
    pub launch_id: Option<String>,
    pub retry: bool,
}

impl StartTestItemRq {
    pub fn new(name: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            name: name.into(),
            description: None,
            item_type,
            start_time: Utc::now(),
            launch_id: None,
            retry: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCreatedRs {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub issue_type: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishTestItemRq {
    pub end_time: DateTime<Utc>,
    pub status: Option<ItemStatus>,
    pub issue: Option<Issue>,
}

impl FinishTestItemRq {
    pub fn with_status(status: ItemStatus) -> Self {
        Self {
            end_time: Utc::now(),
            status: Some(status),
            issue: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCompletionRs {
    pub result_message: String,
}

/// Binary attachment of a log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFile {
    pub name: String,
    /// Sent as a separate binary part, never inside the JSON part
    #[serde(skip)]
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveLogRq {
    pub item_id: String,
    pub time: DateTime<Utc>,
    pub message: String,
    pub level: LogLevel,
    pub file: Option<LogFile>,
}

impl SaveLogRq {
    pub fn new(item_id: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            time: Utc::now(),
            message: message.into(),
            level,
            file: None,
        }
    }

    pub fn with_file(mut self, file: LogFile) -> Self {
        self.file = Some(file);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryCreatedRs {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSaveOperatingRs {
    pub responses: Vec<EntryCreatedRs>,
}
