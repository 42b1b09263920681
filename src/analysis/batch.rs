//! Batch optimization: partitioning a task DAG into ordered parallel batches.
//!
//! The optimizer first layers the graph topologically (each layer holds
//! tasks whose declared predecessors all sit in strictly earlier
//! layers), which guarantees the cross-batch dependency invariant by
//! construction. Within a layer, tasks are split into sub-batches of at
//! most `max_parallel_agents`, using a goal-specific packing heuristic.

use crate::core::dag::TaskGraph;
use crate::core::task::{Task, TaskId};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Upper bound on the parallel agent budget.
pub const MAX_PARALLEL_AGENTS: usize = 20;

/// Objective for the within-layer packing heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizationGoal {
    /// Longest-processing-time-first packing approximating the critical path.
    MinimizeTime,
    /// Equalize total assigned duration across sub-batches.
    BalanceLoad,
    /// Keep tasks with overlapping resource references apart.
    MinimizeConflicts,
}

impl std::fmt::Display for OptimizationGoal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimizationGoal::MinimizeTime => write!(f, "minimize-time"),
            OptimizationGoal::BalanceLoad => write!(f, "balance-load"),
            OptimizationGoal::MinimizeConflicts => write!(f, "minimize-conflicts"),
        }
    }
}

/// A group of mutually independent tasks scheduled to run concurrently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Deterministic id: `batch-<layer>-<slot>`.
    pub id: String,
    /// Member tasks; no declared edge exists between any two of them.
    pub tasks: Vec<Task>,
    /// Max of member durations, since members execute concurrently.
    pub estimated_minutes: u32,
    /// Ids of the batches in the immediately preceding layer.
    pub depends_on_batches: BTreeSet<String>,
}

impl Batch {
    fn new(layer: usize, slot: usize, tasks: Vec<Task>, previous_layer: &[String]) -> Self {
        let estimated_minutes = tasks.iter().map(|t| t.minutes_or_default()).max().unwrap_or(0);
        Self {
            id: format!("batch-{}-{}", layer, slot),
            tasks,
            estimated_minutes,
            depends_on_batches: previous_layer.iter().cloned().collect(),
        }
    }

    /// Total member duration, used for load scoring.
    pub fn total_minutes(&self) -> u64 {
        self.tasks.iter().map(|t| u64::from(t.minutes_or_default())).sum()
    }
}

/// Output of [`optimize_batches`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPlan {
    /// Batches in execution order (layer by layer).
    pub batches: Vec<Batch>,
    /// Minutes assuming layers run serially and batches within a layer
    /// run in parallel: sum over layers of the layer's max batch duration.
    pub estimated_total_time: u64,
    /// `100 × (1 − stddev/mean)` over per-batch total durations, clamped
    /// to [0, 100].
    pub load_balance: f64,
    /// Human-readable summary of the plan.
    pub reasoning: String,
}

/// Partitions task DAGs into batches under an agent budget.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchOptimizer;

impl BatchOptimizer {
    /// Create an optimizer.
    pub fn new() -> Self {
        Self
    }

    /// See [`optimize_batches`].
    pub fn optimize(
        &self,
        tasks: &[Task],
        graph: &TaskGraph,
        max_parallel_agents: usize,
        goal: OptimizationGoal,
    ) -> Result<BatchPlan> {
        optimize_batches(tasks, graph, max_parallel_agents, goal)
    }
}

/// Partition `tasks` into ordered parallel batches.
///
/// # Errors
/// `ValidationError` on an empty task list, an agent budget outside
/// `1..=20`, tasks missing from the graph, or a cyclic graph.
pub fn optimize_batches(
    tasks: &[Task],
    graph: &TaskGraph,
    max_parallel_agents: usize,
    goal: OptimizationGoal,
) -> Result<BatchPlan> {
    if tasks.is_empty() {
        return Err(Error::Validation("task list must not be empty".to_string()));
    }
    if max_parallel_agents < 1 {
        return Err(Error::Validation(
            "max_parallel_agents must be at least 1".to_string(),
        ));
    }
    if max_parallel_agents > MAX_PARALLEL_AGENTS {
        return Err(Error::Validation(format!(
            "max_parallel_agents {} exceeds maximum of {}",
            max_parallel_agents, MAX_PARALLEL_AGENTS
        )));
    }
    for task in tasks {
        if !graph.contains_task(&task.id) {
            return Err(Error::Validation(format!(
                "task {} is not present in the dependency graph",
                task.id
            )));
        }
    }
    if graph.task_count() != tasks.len() {
        return Err(Error::Validation(format!(
            "graph has {} tasks but {} were supplied",
            graph.task_count(),
            tasks.len()
        )));
    }
    if !graph.is_acyclic() {
        return Err(Error::Validation(
            "dependency graph contains cycles; resolve them before batching".to_string(),
        ));
    }

    let by_id: HashMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.id, t)).collect();
    let layers = graph.layers()?;

    let mut batches: Vec<Batch> = Vec::new();
    let mut estimated_total_time = 0u64;
    let mut previous_layer_ids: Vec<String> = Vec::new();

    for (layer_index, layer) in layers.iter().enumerate() {
        // Duration-descending, id-ascending for deterministic packing.
        let mut layer_tasks: Vec<&Task> = layer
            .iter()
            .filter_map(|id| by_id.get(id).copied())
            .collect();
        layer_tasks.sort_by(|a, b| {
            b.minutes_or_default()
                .cmp(&a.minutes_or_default())
                .then_with(|| a.id.cmp(&b.id))
        });

        let slots = layer_tasks.len().div_ceil(max_parallel_agents);
        let groups = match goal {
            OptimizationGoal::MinimizeTime => {
                pack_minimize_time(&layer_tasks, slots, max_parallel_agents)
            }
            OptimizationGoal::BalanceLoad => {
                pack_balance_load(&layer_tasks, slots, max_parallel_agents)
            }
            OptimizationGoal::MinimizeConflicts => {
                pack_minimize_conflicts(&layer_tasks, slots, max_parallel_agents)
            }
        };

        let mut layer_max = 0u64;
        let mut this_layer_ids = Vec::new();
        for (slot, group) in groups.into_iter().enumerate() {
            let batch = Batch::new(
                layer_index,
                slot,
                group.into_iter().cloned().collect(),
                &previous_layer_ids,
            );
            layer_max = layer_max.max(u64::from(batch.estimated_minutes));
            this_layer_ids.push(batch.id.clone());
            batches.push(batch);
        }
        estimated_total_time += layer_max;
        previous_layer_ids = this_layer_ids;
    }

    let load_balance = load_balance_score(&batches);
    let reasoning = format!(
        "{} tasks across {} layers packed into {} batches under the {} goal with up to {} parallel agents",
        tasks.len(),
        layers.len(),
        batches.len(),
        goal,
        max_parallel_agents
    );

    tracing::debug!(
        batches = batches.len(),
        total_minutes = estimated_total_time,
        load_balance,
        "batch plan computed"
    );

    Ok(BatchPlan {
        batches,
        estimated_total_time,
        load_balance,
        reasoning,
    })
}

/// LPT bin packing: each task (already duration-descending) goes to the
/// sub-batch with the lowest current max duration that still has room.
fn pack_minimize_time<'a>(
    layer_tasks: &[&'a Task],
    slots: usize,
    capacity: usize,
) -> Vec<Vec<&'a Task>> {
    let mut groups: Vec<Vec<&Task>> = vec![Vec::new(); slots];
    for &task in layer_tasks {
        let target = best_slot(&groups, capacity, |g| {
            g.iter().map(|t| u64::from(t.minutes_or_default())).max().unwrap_or(0)
        });
        groups[target].push(task);
    }
    groups
}

/// Weighted distribution: each task goes to the sub-batch with the
/// lowest total assigned duration that still has room.
fn pack_balance_load<'a>(
    layer_tasks: &[&'a Task],
    slots: usize,
    capacity: usize,
) -> Vec<Vec<&'a Task>> {
    let mut groups: Vec<Vec<&Task>> = vec![Vec::new(); slots];
    for &task in layer_tasks {
        let target = best_slot(&groups, capacity, |g| {
            g.iter().map(|t| u64::from(t.minutes_or_default())).sum()
        });
        groups[target].push(task);
    }
    groups
}

/// Conflict-averse packing: prefer a sub-batch whose members share no
/// resource tokens with the task; fall back to duration packing when
/// every open sub-batch overlaps (or no overlap signal exists).
fn pack_minimize_conflicts<'a>(
    layer_tasks: &[&'a Task],
    slots: usize,
    capacity: usize,
) -> Vec<Vec<&'a Task>> {
    use crate::analysis::implicit::resource_tokens;

    let tokens: HashMap<&TaskId, BTreeSet<String>> = layer_tasks
        .iter()
        .map(|t| (&t.id, resource_tokens(&t.description)))
        .collect();

    let mut groups: Vec<Vec<&Task>> = vec![Vec::new(); slots];
    for &task in layer_tasks {
        let task_tokens = &tokens[&task.id];
        let clean = (0..groups.len()).find(|&i| {
            groups[i].len() < capacity
                && groups[i].iter().all(|member| {
                    tokens[&member.id].intersection(task_tokens).next().is_none()
                })
        });
        let target = match clean {
            Some(i) => i,
            None => best_slot(&groups, capacity, |g| {
                g.iter().map(|t| u64::from(t.minutes_or_default())).max().unwrap_or(0)
            }),
        };
        groups[target].push(task);
    }
    groups
}

/// Index of the open sub-batch minimizing `cost`, first match on ties.
fn best_slot<F>(groups: &[Vec<&Task>], capacity: usize, cost: F) -> usize
where
    F: Fn(&Vec<&Task>) -> u64,
{
    groups
        .iter()
        .enumerate()
        .filter(|(_, g)| g.len() < capacity)
        .min_by_key(|(i, g)| (cost(g), *i))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn load_balance_score(batches: &[Batch]) -> f64 {
    let totals: Vec<f64> = batches.iter().map(|b| b.total_minutes() as f64).collect();
    if totals.is_empty() {
        return 100.0;
    }
    let mean = totals.iter().sum::<f64>() / totals.len() as f64;
    if mean == 0.0 {
        return 100.0;
    }
    let variance = totals.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / totals.len() as f64;
    let stddev = variance.sqrt();
    (100.0 * (1.0 - stddev / mean)).clamp(0.0, 100.0)
}
