//! Core domain models for parallelization analysis.
//!
//! This module contains the fundamental data structures used throughout
//! the engine: tasks, the declared dependency graph, and the execution
//! reports delivered by the caller's execution layer.

pub mod dag;
pub mod report;
pub mod task;

pub use dag::TaskGraph;
pub use report::{AgentId, AgentProgress, AgentResult, AgentStatus, ChangeType, FileChange};
pub use task::{Task, TaskId};
