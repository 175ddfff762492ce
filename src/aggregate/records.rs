//! Rows emitted at the end of a run. Field names match the columns of the
//! logs and tasks tables so each struct serializes directly into one
//! `JSONEachRow` line.

use crate::aggregate::purity::PureRunAssessment;
use serde::{Deserialize, Serialize};

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Check,
    Play,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Check => "check",
            EventType::Play => "play",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
}

impl RunStatus {
    pub fn from_failed_hosts(failed_hosts: u64) -> Self {
        if failed_hosts > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Success
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }
}

/// One row of the logs table, describing a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub event_date: String,
    pub start_time: String,
    pub end_time: String,
    /// Whole seconds between run start and run end.
    pub duration: u64,
    pub user: String,
    pub hostname: String,
    pub inventory: String,
    pub playbook: String,
    pub event_type: EventType,
    pub status: RunStatus,
    pub branch: String,
    pub tags: Vec<String>,
    pub skipped_tags: Vec<String>,
    pub extra_vars: Vec<String>,
    pub limit_expression: String,
    pub hosts: Vec<String>,
    pub affected_hosts_count: u64,
    pub unreachable_hosts_count: u64,
    pub failed_hosts_count: u64,
    pub connection_mode: String,
    pub forks_count: u32,
    pub pure_play: bool,
}

/// One row of the tasks table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub event_date: String,
    pub playbook: String,
    pub user: String,
    pub role: String,
    pub task: String,
    /// Milliseconds, truncated.
    pub duration: u64,
}

/// Everything a finished run produces, ready for shipping.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub summary: RunSummary,
    pub tasks: Vec<TaskRecord>,
    pub purity: PureRunAssessment,
}
