//! Dependency graph construction (analysis entry point).
//!
//! Validates the caller's task list, builds the declared dependency
//! graph, enumerates cycles, and optionally runs the advisory
//! implicit-dependency scan. Cycles are reported as data rather than
//! errors: their presence is meaningful output the caller acts on.

use crate::analysis::implicit::{self, ImplicitDependency};
use crate::core::dag::TaskGraph;
use crate::core::task::{validate_task_set, Task, TaskId};
use crate::error::Result;

/// Output of [`build_dependency_graph`].
#[derive(Debug)]
pub struct GraphAnalysis {
    /// The declared dependency graph (possibly cyclic).
    pub graph: TaskGraph,
    /// Advisory candidates; empty when detection was disabled.
    pub implicit_dependencies: Vec<ImplicitDependency>,
    /// Whether any declared cycle exists.
    pub has_cycles: bool,
    /// The enumerated cycles, one id path per cycle.
    pub cycles: Vec<Vec<TaskId>>,
}

/// Builds dependency graphs from task lists.
///
/// Stateless; exists so callers can hold a component handle alongside
/// the other analysis components.
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphBuilder;

impl GraphBuilder {
    /// Create a builder.
    pub fn new() -> Self {
        Self
    }

    /// See [`build_dependency_graph`].
    pub fn build(&self, tasks: &[Task], detect_implicit: bool) -> Result<GraphAnalysis> {
        build_dependency_graph(tasks, detect_implicit)
    }
}

/// Validate a task list and construct its dependency graph.
///
/// Validation failures (empty list, duplicate or missing ids,
/// self-dependency, dangling reference, more than 100 tasks) abort
/// before any graph work with a field-identifying message.
///
/// When `detect_implicit` is set, the pairwise heuristic scan runs and
/// its candidates ride along in the result; they never become graph
/// edges and never affect `has_cycles`.
pub fn build_dependency_graph(tasks: &[Task], detect_implicit: bool) -> Result<GraphAnalysis> {
    validate_task_set(tasks)?;

    let graph = TaskGraph::from_tasks(tasks)?;
    let cycles = graph.find_cycles();
    let has_cycles = !cycles.is_empty();

    let implicit_dependencies = if detect_implicit {
        implicit::detect(tasks)
    } else {
        Vec::new()
    };

    tracing::debug!(
        tasks = graph.task_count(),
        edges = graph.dependency_count(),
        cycles = cycles.len(),
        implicit = implicit_dependencies.len(),
        "dependency graph built"
    );

    Ok(GraphAnalysis {
        graph,
        implicit_dependencies,
        has_cycles,
        cycles,
    })
}
