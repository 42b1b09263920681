//! Parallelizability analysis.
//!
//! Decides whether a set of subtasks is worth fanning out across
//! parallel agents, backed by the dependency graph and the batch
//! optimizer. The verdict comes with a confidence score, a projected
//! speedup, suggested batches, and any risks the caller should weigh.

use crate::analysis::batch::{optimize_batches, Batch, OptimizationGoal};
use crate::analysis::builder::{build_dependency_graph, GraphAnalysis};
use crate::core::dag::TaskGraph;
use crate::core::task::{Task, MAX_DESCRIPTION_LEN};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Minimum subtask count below which fan-out is never recommended.
/// The fixed coordination overhead of spinning up parallel execution
/// is not justified under this threshold.
pub const MIN_PARALLEL_TASKS: usize = 3;

/// Tunables for [`analyze_parallelizability`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Speedup below which the verdict is "not worth parallelizing".
    pub min_speedup: f64,
    /// Implicit-dependency confidence at which a correctness risk is raised.
    pub implicit_risk_threshold: u8,
    /// Agent budget used when suggesting batches.
    pub default_agents: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_speedup: 1.5,
            implicit_risk_threshold: 70,
            default_agents: 4,
        }
    }
}

/// Category of a surfaced risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    /// The declared graph contains a cycle; execution cannot be ordered.
    CycleDetected,
    /// A single task accounts for more than half the total duration.
    DominantTask,
    /// A high-confidence implicit dependency was not declared.
    UndeclaredDependency,
}

/// A concern the caller should weigh before fanning out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub kind: RiskKind,
    /// Blocking risks make parallel execution unsound, not merely slow.
    pub blocking: bool,
    pub detail: String,
}

/// Output of [`analyze_parallelizability`].
#[derive(Debug)]
pub struct ParallelAnalysis {
    /// Whether fan-out is recommended.
    pub parallelizable: bool,
    /// Confidence in the verdict, 0..=100.
    pub confidence: u8,
    /// Human-readable explanation of the verdict.
    pub reasoning: String,
    /// The underlying graph analysis (graph, cycles, implicit candidates).
    pub analysis: GraphAnalysis,
    /// Batches from the optimizer under the minimize-time goal; empty
    /// when the verdict is negative for structural reasons.
    pub suggested_batches: Vec<Batch>,
    /// Projected speedup versus sequential execution: the lesser of the
    /// independence bound (independent count / 2) and the critical-path
    /// bound. Can dip below 1.0 when few root tasks exist.
    pub estimated_speedup: f64,
    /// Risks surfaced during analysis, blocking ones first.
    pub risks: Vec<Risk>,
}

/// Analyzes task sets for parallel execution potential.
#[derive(Debug, Clone, Default)]
pub struct ParallelizabilityAnalyzer {
    config: AnalyzerConfig,
}

impl ParallelizabilityAnalyzer {
    /// Create an analyzer with the given tunables.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// See [`analyze_parallelizability`].
    pub fn analyze(&self, description: &str, subtasks: &[Task]) -> Result<ParallelAnalysis> {
        analyze_parallelizability(description, subtasks, &self.config)
    }
}

/// Decide whether `subtasks` should run in parallel.
///
/// Fewer than [`MIN_PARALLEL_TASKS`] subtasks is an immediate negative
/// verdict with `estimated_speedup` of 1.0. Otherwise the speedup is
/// bounded by both the independent task count and the ratio of
/// sequential duration to the critical path, and the verdict compares
/// it against `config.min_speedup`.
///
/// # Errors
/// `ValidationError` when the description exceeds the length limit or
/// the subtask list fails graph validation.
pub fn analyze_parallelizability(
    description: &str,
    subtasks: &[Task],
    config: &AnalyzerConfig,
) -> Result<ParallelAnalysis> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(Error::Validation(format!(
            "task description exceeds {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }

    if subtasks.len() < MIN_PARALLEL_TASKS {
        let analysis = if subtasks.is_empty() {
            GraphAnalysis {
                graph: TaskGraph::new(),
                implicit_dependencies: Vec::new(),
                has_cycles: false,
                cycles: Vec::new(),
            }
        } else {
            build_dependency_graph(subtasks, true)?
        };
        return Ok(ParallelAnalysis {
            parallelizable: false,
            confidence: 90,
            reasoning: format!(
                "only {} subtasks supplied; at least {} are needed to justify \
                 parallel coordination overhead",
                subtasks.len(),
                MIN_PARALLEL_TASKS
            ),
            analysis,
            suggested_batches: Vec::new(),
            estimated_speedup: 1.0,
            risks: Vec::new(),
        });
    }

    let analysis = build_dependency_graph(subtasks, true)?;
    let mut risks = Vec::new();

    if analysis.has_cycles {
        for cycle in &analysis.cycles {
            let path: Vec<&str> = cycle.iter().map(|id| id.as_str()).collect();
            risks.push(Risk {
                kind: RiskKind::CycleDetected,
                blocking: true,
                detail: format!("dependency cycle: {}", path.join(" -> ")),
            });
        }
        return Ok(ParallelAnalysis {
            parallelizable: false,
            confidence: 95,
            reasoning: format!(
                "the dependency graph contains {} cycle(s); no execution order exists \
                 until they are resolved",
                analysis.cycles.len()
            ),
            analysis,
            suggested_batches: Vec::new(),
            estimated_speedup: 1.0,
            risks,
        });
    }

    let independent_count = analysis.graph.independent_tasks().len();
    let sequential_minutes = analysis.graph.sequential_minutes();
    let (critical_path, critical_minutes) = analysis.graph.critical_path()?;

    let independence_bound = independent_count as f64 / 2.0;
    let path_bound = if critical_minutes > 0 {
        sequential_minutes as f64 / critical_minutes as f64
    } else {
        1.0
    };
    let estimated_speedup = independence_bound.min(path_bound);
    let parallelizable = estimated_speedup >= config.min_speedup;

    // Bottleneck risk: one task dominating total duration caps any
    // realizable speedup regardless of graph shape.
    for task in subtasks {
        let minutes = u64::from(task.minutes_or_default());
        if subtasks.len() >= 2 && minutes * 2 > sequential_minutes {
            risks.push(Risk {
                kind: RiskKind::DominantTask,
                blocking: false,
                detail: format!(
                    "task {} accounts for {} of {} total minutes",
                    task.id, minutes, sequential_minutes
                ),
            });
        }
    }

    let mut risky_implicit = 0usize;
    for dep in &analysis.implicit_dependencies {
        if dep.confidence >= config.implicit_risk_threshold {
            risky_implicit += 1;
            risks.push(Risk {
                kind: RiskKind::UndeclaredDependency,
                blocking: false,
                detail: format!(
                    "{} likely depends on {} (confidence {}): {}",
                    dep.to, dep.from, dep.confidence, dep.reasoning
                ),
            });
        }
    }

    let margin = (estimated_speedup - config.min_speedup).abs();
    let base = (55.0 + margin * 30.0).clamp(0.0, 95.0) as i64;
    let confidence = (base - 10 * risky_implicit as i64).clamp(20, 100) as u8;

    let suggested_batches = optimize_batches(
        subtasks,
        &analysis.graph,
        config.default_agents,
        OptimizationGoal::MinimizeTime,
    )?
    .batches;

    let reasoning = format!(
        "{} of {} tasks are independent; critical path {} min ({} tasks) versus {} min \
         sequential gives an estimated {:.2}x speedup against a {:.1}x threshold",
        independent_count,
        subtasks.len(),
        critical_minutes,
        critical_path.len(),
        sequential_minutes,
        estimated_speedup,
        config.min_speedup
    );

    tracing::debug!(
        parallelizable,
        confidence,
        speedup = estimated_speedup,
        risks = risks.len(),
        "parallelizability analysis complete"
    );

    Ok(ParallelAnalysis {
        parallelizable,
        confidence,
        reasoning,
        analysis,
        suggested_batches,
        estimated_speedup,
        risks,
    })
}
