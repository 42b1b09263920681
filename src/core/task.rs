//! Task data model for parallelization analysis.
//!
//! Tasks are the atomic units of work the engine reasons about. They are
//! supplied by the caller, validated once, and treated as immutable for
//! the duration of an analysis call.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Maximum number of tasks accepted in one analysis call.
pub const MAX_TASKS: usize = 100;

/// Maximum length of a task (or overall) description in characters.
pub const MAX_DESCRIPTION_LEN: usize = 5000;

/// Valid range for a task's estimated duration, in minutes.
pub const MIN_TASK_MINUTES: u32 = 1;
pub const MAX_TASK_MINUTES: u32 = 1440;

/// Duration assumed for tasks whose caller did not supply an estimate.
pub const DEFAULT_TASK_MINUTES: u32 = 30;

/// Unique identifier for a task within a task set.
///
/// Ids are caller-supplied strings; uniqueness within a set is enforced
/// during validation rather than by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a task id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A single task in the analysis input.
///
/// `depends_on` lists the ids of tasks that must complete before this
/// one can start. Order is preserved as given by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within the task set.
    pub id: TaskId,
    /// What the task should accomplish.
    pub description: String,
    /// Estimated duration in minutes, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    /// Ids of tasks this task depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,
}

impl Task {
    /// Create a task with no duration estimate and no dependencies.
    pub fn new(id: impl Into<TaskId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            estimated_minutes: None,
            depends_on: Vec::new(),
        }
    }

    /// Set the estimated duration in minutes.
    pub fn with_minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = Some(minutes);
        self
    }

    /// Set the declared dependencies.
    pub fn with_depends_on<I, T>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TaskId>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// The duration used for scheduling math: the caller's estimate, or
    /// [`DEFAULT_TASK_MINUTES`] when none was given.
    pub fn minutes_or_default(&self) -> u32 {
        self.estimated_minutes.unwrap_or(DEFAULT_TASK_MINUTES)
    }

    /// Validate this task in isolation (set-level checks such as
    /// duplicate ids live in [`validate_task_set`]).
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().is_empty() {
            return Err(Error::Validation("task id must not be empty".to_string()));
        }
        if self.description.is_empty() {
            return Err(Error::Validation(format!(
                "task {} is missing a description",
                self.id
            )));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(Error::Validation(format!(
                "task {} description exceeds {} characters",
                self.id, MAX_DESCRIPTION_LEN
            )));
        }
        if let Some(minutes) = self.estimated_minutes {
            if !(MIN_TASK_MINUTES..=MAX_TASK_MINUTES).contains(&minutes) {
                return Err(Error::Validation(format!(
                    "task {} estimated_minutes {} outside {}..={}",
                    self.id, minutes, MIN_TASK_MINUTES, MAX_TASK_MINUTES
                )));
            }
        }
        if self.depends_on.contains(&self.id) {
            return Err(Error::Validation(format!(
                "task {} depends on itself",
                self.id
            )));
        }
        Ok(())
    }
}

/// Validate a task set as a whole: size bounds, per-task rules,
/// duplicate ids, and dangling dependency references.
///
/// Fails before any graph work; no partial structure escapes a
/// validation failure.
pub fn validate_task_set(tasks: &[Task]) -> Result<()> {
    if tasks.is_empty() {
        return Err(Error::Validation("task list must not be empty".to_string()));
    }
    if tasks.len() > MAX_TASKS {
        return Err(Error::Validation(format!(
            "task list has {} tasks, maximum is {}",
            tasks.len(),
            MAX_TASKS
        )));
    }

    let mut seen = std::collections::HashSet::new();
    for task in tasks {
        task.validate()?;
        if !seen.insert(&task.id) {
            return Err(Error::Validation(format!(
                "duplicate task id: {}",
                task.id
            )));
        }
    }

    for task in tasks {
        for dep in &task.depends_on {
            if !seen.contains(dep) {
                return Err(Error::Validation(format!(
                    "task {} depends on unknown task {}",
                    task.id, dep
                )));
            }
        }
    }

    Ok(())
}
