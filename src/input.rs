//! Planning request format and JSON loading.
//!
//! A `PlanInput` is everything one planning run consumes: the extracted
//! tasks and dependency hints, the project calendar, progress on tasks
//! that already exist, and the team roster.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::task::{RawEdge, TaskId, TaskSpec};
use crate::team::MemberSpec;

/// Fixed project calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ProjectWindow {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// Whole calendar days between `from` (clamped into the window) and the end date.
    pub fn days_remaining_from(&self, from: NaiveDate) -> i64 {
        let from = from.max(self.start_date).min(self.end_date);
        (self.end_date - from).num_days()
    }
}

/// Status of an already-existing task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Done,
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressStatus::NotStarted => write!(f, "not_started"),
            ProgressStatus::InProgress => write!(f, "in_progress"),
            ProgressStatus::Done => write!(f, "done"),
        }
    }
}

/// Progress recorded against an existing task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub task_id: TaskId,
    #[serde(default)]
    pub status: ProgressStatus,
}

impl ProgressEntry {
    pub fn new(task_id: &str, status: ProgressStatus) -> Self {
        Self {
            task_id: TaskId::from(task_id),
            status,
        }
    }
}

/// One complete planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanInput {
    pub tasks: Vec<TaskSpec>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
    pub project_window: ProjectWindow,
    #[serde(default)]
    pub existing_progress: Vec<ProgressEntry>,
    #[serde(default)]
    pub members: Vec<MemberSpec>,
}

impl PlanInput {
    /// Load a planning request from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan input: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse plan input JSON: {}", path.display()))
    }

    /// Parse a planning request from a JSON string.
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid plan input")
    }

    /// Save the request as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize plan input")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write plan input: {}", path.display()))?;
        Ok(())
    }
}
