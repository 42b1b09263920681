//! Execution reports produced by the caller's execution layer.
//!
//! The engine never runs tasks itself; an external executor (real or
//! simulated) produces [`AgentResult`] records after the fact and
//! [`AgentProgress`] snapshots while running. These types are the
//! consumption-side contract for the conflict detector and the
//! progress aggregator.

use crate::core::task::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Identifier of an executing agent, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    /// Create an agent id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of change made to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Create,
    Modify,
    Delete,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Create => write!(f, "create"),
            ChangeType::Modify => write!(f, "modify"),
            ChangeType::Delete => write!(f, "delete"),
        }
    }
}

/// A single file change within an agent's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path of the changed file.
    pub file: PathBuf,
    /// What kind of change was made.
    pub change_type: ChangeType,
    /// New content, when the executor captured it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Inclusive line range touched by a modify, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<(u32, u32)>,
}

impl FileChange {
    /// Create a change record with no content or line information.
    pub fn new(file: impl Into<PathBuf>, change_type: ChangeType) -> Self {
        Self {
            file: file.into(),
            change_type,
            content: None,
            line_range: None,
        }
    }

    /// Attach captured content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Attach the touched line range.
    pub fn with_lines(mut self, start: u32, end: u32) -> Self {
        self.line_range = Some((start, end));
        self
    }

    /// Check whether two modify ranges overlap. Changes without line
    /// information are treated as overlapping conservatively.
    pub fn lines_overlap(&self, other: &FileChange) -> bool {
        match (self.line_range, other.line_range) {
            (Some((s1, e1)), Some((s2, e2))) => s1 <= e2 && s2 <= e1,
            _ => true,
        }
    }
}

/// Report of one task's outcome from the execution layer.
///
/// The slice order in which results are handed to the conflict
/// detector is treated as completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// The agent that executed the task.
    pub agent_id: AgentId,
    /// The task that was executed.
    pub task_id: TaskId,
    /// Whether the task completed successfully.
    pub success: bool,
    /// Every file the agent modified.
    pub files_modified: BTreeSet<PathBuf>,
    /// Detailed changes, when the executor captured them. Absence
    /// degrades semantic conflict detection, never fails it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<FileChange>>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Error message for failed tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResult {
    /// Create a successful result with no file activity.
    pub fn success(agent_id: impl Into<String>, task_id: impl Into<TaskId>) -> Self {
        Self {
            agent_id: AgentId::new(agent_id),
            task_id: task_id.into(),
            success: true,
            files_modified: BTreeSet::new(),
            changes: None,
            duration_ms: 0,
            error: None,
        }
    }

    /// Create a failed result.
    pub fn failure(
        agent_id: impl Into<String>,
        task_id: impl Into<TaskId>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: AgentId::new(agent_id),
            task_id: task_id.into(),
            success: false,
            files_modified: BTreeSet::new(),
            changes: None,
            duration_ms: 0,
            error: Some(error.into()),
        }
    }

    /// Add a modified file path.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files_modified.insert(path.into());
        self
    }

    /// Attach detailed changes; their files are added to
    /// `files_modified` as well.
    pub fn with_changes(mut self, changes: Vec<FileChange>) -> Self {
        for change in &changes {
            self.files_modified.insert(change.file.clone());
        }
        self.changes = Some(changes);
        self
    }

    /// Set the execution duration.
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }
}

/// Execution state of an agent at a polling instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Working,
    Blocked,
    Complete,
    Failed,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Working => write!(f, "working"),
            AgentStatus::Blocked => write!(f, "blocked"),
            AgentStatus::Complete => write!(f, "complete"),
            AgentStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One agent's progress snapshot at a polling interval.
///
/// The engine aggregates the snapshot it is given and stores no
/// history between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProgress {
    /// The reporting agent.
    pub agent_id: AgentId,
    /// The task the agent is currently on.
    pub current_task: TaskId,
    /// Completion percentage in [0, 100].
    pub percent_complete: f64,
    /// Execution state.
    pub status: AgentStatus,
    /// Relative weight for weighted aggregation; missing means 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_weight: Option<f64>,
    /// Remaining time in minutes, when the executor can estimate it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes_remaining: Option<f64>,
    /// When the agent started its current task; enables linear
    /// extrapolation of remaining time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl AgentProgress {
    /// Create a working snapshot at the given completion percentage.
    pub fn new(
        agent_id: impl Into<String>,
        current_task: impl Into<TaskId>,
        percent_complete: f64,
    ) -> Self {
        Self {
            agent_id: AgentId::new(agent_id),
            current_task: current_task.into(),
            percent_complete,
            status: AgentStatus::Working,
            task_weight: None,
            estimated_minutes_remaining: None,
            started_at: None,
        }
    }

    /// Set the execution state.
    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the aggregation weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.task_weight = Some(weight);
        self
    }

    /// Set the executor's own remaining-time estimate.
    pub fn with_remaining_minutes(mut self, minutes: f64) -> Self {
        self.estimated_minutes_remaining = Some(minutes);
        self
    }

    /// Set the task start time.
    pub fn with_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // AgentId tests

    #[test]
    fn test_agent_id_display() {
        let id = AgentId::new("agent-1");
        assert_eq!(format!("{}", id), "agent-1");
    }

    #[test]
    fn test_agent_id_serialization_transparent() {
        let id = AgentId::new("agent-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"agent-1\"");
    }

    // ChangeType tests

    #[test]
    fn test_change_type_display() {
        assert_eq!(format!("{}", ChangeType::Create), "create");
        assert_eq!(format!("{}", ChangeType::Modify), "modify");
        assert_eq!(format!("{}", ChangeType::Delete), "delete");
    }

    #[test]
    fn test_change_type_serialization() {
        let json = serde_json::to_string(&ChangeType::Create).unwrap();
        assert_eq!(json, "\"create\"");
        let parsed: ChangeType = serde_json::from_str("\"delete\"").unwrap();
        assert_eq!(parsed, ChangeType::Delete);
    }

    #[test]
    fn test_change_type_rejects_invalid() {
        let parsed: std::result::Result<ChangeType, _> = serde_json::from_str("\"rename\"");
        assert!(parsed.is_err());
    }

    // FileChange tests

    #[test]
    fn test_file_change_new() {
        let change = FileChange::new("src/user.rs", ChangeType::Modify);
        assert_eq!(change.file, PathBuf::from("src/user.rs"));
        assert!(change.content.is_none());
        assert!(change.line_range.is_none());
    }

    #[test]
    fn test_file_change_lines_overlap() {
        let a = FileChange::new("f", ChangeType::Modify).with_lines(1, 10);
        let b = FileChange::new("f", ChangeType::Modify).with_lines(5, 20);
        let c = FileChange::new("f", ChangeType::Modify).with_lines(11, 20);
        assert!(a.lines_overlap(&b));
        assert!(!a.lines_overlap(&c));
    }

    #[test]
    fn test_file_change_overlap_conservative_without_lines() {
        let a = FileChange::new("f", ChangeType::Modify);
        let b = FileChange::new("f", ChangeType::Modify).with_lines(5, 20);
        assert!(a.lines_overlap(&b));
    }

    #[test]
    fn test_file_change_adjacent_ranges_touch() {
        let a = FileChange::new("f", ChangeType::Modify).with_lines(1, 5);
        let b = FileChange::new("f", ChangeType::Modify).with_lines(5, 9);
        assert!(a.lines_overlap(&b));
    }

    // AgentResult tests

    #[test]
    fn test_agent_result_success() {
        let result = AgentResult::success("agent-1", "task-1").with_duration_ms(1200);
        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.duration_ms, 1200);
    }

    #[test]
    fn test_agent_result_failure() {
        let result = AgentResult::failure("agent-1", "task-1", "tests failed");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("tests failed"));
    }

    #[test]
    fn test_agent_result_with_changes_collects_files() {
        let result = AgentResult::success("agent-1", "task-1").with_changes(vec![
            FileChange::new("src/a.rs", ChangeType::Create),
            FileChange::new("src/b.rs", ChangeType::Modify),
        ]);
        assert!(result.files_modified.contains(&PathBuf::from("src/a.rs")));
        assert!(result.files_modified.contains(&PathBuf::from("src/b.rs")));
    }

    #[test]
    fn test_agent_result_serialization_roundtrip() {
        let result = AgentResult::success("agent-1", "task-1")
            .with_file("src/a.rs")
            .with_duration_ms(50);
        let json = serde_json::to_string(&result).unwrap();
        let parsed: AgentResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, parsed);
    }

    #[test]
    fn test_agent_result_changes_optional_in_json() {
        let json = r#"{
            "agent_id": "a1",
            "task_id": "t1",
            "success": true,
            "files_modified": ["src/a.rs"],
            "duration_ms": 10
        }"#;
        let parsed: AgentResult = serde_json::from_str(json).unwrap();
        assert!(parsed.changes.is_none());
    }

    // AgentStatus / AgentProgress tests

    #[test]
    fn test_agent_status_display() {
        assert_eq!(format!("{}", AgentStatus::Blocked), "blocked");
        assert_eq!(format!("{}", AgentStatus::Working), "working");
    }

    #[test]
    fn test_agent_status_serialization() {
        assert_eq!(
            serde_json::to_string(&AgentStatus::Complete).unwrap(),
            "\"complete\""
        );
    }

    #[test]
    fn test_agent_progress_new_defaults() {
        let progress = AgentProgress::new("agent-1", "task-1", 40.0);
        assert_eq!(progress.status, AgentStatus::Working);
        assert!(progress.task_weight.is_none());
        assert!(progress.estimated_minutes_remaining.is_none());
        assert!(progress.started_at.is_none());
    }

    #[test]
    fn test_agent_progress_builders() {
        let progress = AgentProgress::new("agent-1", "task-1", 40.0)
            .with_status(AgentStatus::Blocked)
            .with_weight(2.0)
            .with_remaining_minutes(12.5);
        assert_eq!(progress.status, AgentStatus::Blocked);
        assert_eq!(progress.task_weight, Some(2.0));
        assert_eq!(progress.estimated_minutes_remaining, Some(12.5));
    }

    #[test]
    fn test_agent_progress_serialization_roundtrip() {
        let progress = AgentProgress::new("agent-1", "task-1", 62.5).with_weight(1.5);
        let json = serde_json::to_string(&progress).unwrap();
        let parsed: AgentProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(progress, parsed);
    }
}
