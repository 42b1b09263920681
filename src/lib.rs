//! Task-parallelization analysis.
//!
//! Five pure components over immutable inputs: dependency graph
//! construction, parallelizability analysis, batch optimization,
//! conflict detection, and progress aggregation. No execution happens
//! here; callers run the tasks and feed the outcomes back in.

pub mod analysis;
pub mod core;
pub mod error;

pub use analysis::{
    aggregate_progress, analyze_parallelizability, build_dependency_graph, detect_conflicts,
    optimize_batches,
};
pub use analysis::{
    AggregationStrategy, AnalyzerConfig, Batch, BatchPlan, ConflictReport, GraphAnalysis,
    OptimizationGoal, ParallelAnalysis, ProgressSummary, ResolutionStrategy,
};
pub use crate::core::{
    AgentId, AgentProgress, AgentResult, AgentStatus, ChangeType, FileChange, Task, TaskGraph,
    TaskId,
};
pub use error::{Error, Result};
