//! Progress aggregation across parallel agents.
//!
//! Folds per-agent progress reports into a single completion figure
//! under a caller-chosen strategy, flags bottleneck agents, and
//! projects a completion time.

use crate::core::dag::TaskGraph;
use crate::core::report::{AgentId, AgentProgress, AgentStatus};
use crate::core::task::{TaskId, DEFAULT_TASK_MINUTES};
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Upper bound on agents per aggregation call.
pub const MAX_AGENTS: usize = 20;

/// Percentage points behind the mean before a working agent counts as
/// lagging.
pub const BOTTLENECK_LAG_POINTS: f64 = 30.0;

/// How per-agent percentages fold into one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationStrategy {
    /// Arithmetic mean of all agents.
    SimpleAverage,
    /// Mean weighted by task weight, missing weights counting as 1.
    Weighted,
    /// Mean over only the agents working the graph's longest path.
    CriticalPath,
}

/// An agent holding the run back, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub agent_id: AgentId,
    pub reason: String,
}

/// Output of [`aggregate_progress`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    /// Overall completion, 0..=100.
    pub overall_progress: f64,
    /// The strategy actually applied, including any degradation note.
    pub method: String,
    /// Latest status per agent.
    pub agent_statuses: BTreeMap<AgentId, AgentStatus>,
    /// Agents holding the run back.
    pub bottlenecks: Vec<Bottleneck>,
    /// Projected completion time.
    pub estimated_completion: DateTime<Utc>,
    /// The duration-weighted longest path, when a graph was supplied
    /// and usable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_path: Option<Vec<TaskId>>,
}

/// Aggregates agent progress reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgressAggregator;

impl ProgressAggregator {
    /// Create an aggregator.
    pub fn new() -> Self {
        Self
    }

    /// See [`aggregate_progress`].
    pub fn aggregate(
        &self,
        agents: &[AgentProgress],
        strategy: AggregationStrategy,
        graph: Option<&TaskGraph>,
    ) -> Result<ProgressSummary> {
        aggregate_progress(agents, strategy, graph)
    }
}

/// Fold `agents` into a [`ProgressSummary`] as of the current time.
///
/// The critical-path strategy needs `graph`; without one (or with a
/// cyclic one) it degrades to a simple average and says so in `method`.
///
/// # Errors
/// `ValidationError` on an empty slice, more than 20 agents, duplicate
/// agent ids, or a completion percentage outside 0..=100.
pub fn aggregate_progress(
    agents: &[AgentProgress],
    strategy: AggregationStrategy,
    graph: Option<&TaskGraph>,
) -> Result<ProgressSummary> {
    aggregate_progress_at(agents, strategy, graph, Utc::now())
}

/// [`aggregate_progress`] with an explicit clock, for deterministic use.
pub fn aggregate_progress_at(
    agents: &[AgentProgress],
    strategy: AggregationStrategy,
    graph: Option<&TaskGraph>,
    now: DateTime<Utc>,
) -> Result<ProgressSummary> {
    validate_agents(agents)?;

    let mean = agents.iter().map(|a| a.percent_complete).sum::<f64>() / agents.len() as f64;

    let mut critical_path = None;
    let (overall_progress, method) = match strategy {
        AggregationStrategy::SimpleAverage => (mean, "simple_average".to_string()),
        AggregationStrategy::Weighted => {
            let total_weight: f64 = agents.iter().map(|a| a.task_weight.unwrap_or(1.0)).sum();
            if total_weight > 0.0 {
                let weighted: f64 = agents
                    .iter()
                    .map(|a| a.percent_complete * a.task_weight.unwrap_or(1.0))
                    .sum();
                (weighted / total_weight, "weighted".to_string())
            } else {
                (
                    mean,
                    "weighted (degraded to simple_average: zero total weight)".to_string(),
                )
            }
        }
        AggregationStrategy::CriticalPath => match graph.map(TaskGraph::critical_path) {
            Some(Ok((path, _))) => {
                let on_path: Vec<f64> = agents
                    .iter()
                    .filter(|a| path.contains(&a.current_task))
                    .map(|a| a.percent_complete)
                    .collect();
                critical_path = Some(path);
                if on_path.is_empty() {
                    (
                        mean,
                        "critical_path (degraded to simple_average: no agents on path)"
                            .to_string(),
                    )
                } else {
                    let avg = on_path.iter().sum::<f64>() / on_path.len() as f64;
                    (avg, "critical_path".to_string())
                }
            }
            Some(Err(_)) => (
                mean,
                "critical_path (degraded to simple_average: cyclic graph)".to_string(),
            ),
            None => (
                mean,
                "critical_path (degraded to simple_average: no graph)".to_string(),
            ),
        },
    };

    let bottlenecks = find_bottlenecks(agents, mean);
    let estimated_completion = now + longest_remaining(agents, now);

    let agent_statuses: BTreeMap<AgentId, AgentStatus> = agents
        .iter()
        .map(|a| (a.agent_id.clone(), a.status))
        .collect();

    tracing::debug!(
        agents = agents.len(),
        overall = overall_progress,
        method = %method,
        bottlenecks = bottlenecks.len(),
        "progress aggregated"
    );

    Ok(ProgressSummary {
        overall_progress,
        method,
        agent_statuses,
        bottlenecks,
        estimated_completion,
        critical_path,
    })
}

fn validate_agents(agents: &[AgentProgress]) -> Result<()> {
    if agents.is_empty() {
        return Err(Error::Validation(
            "agent progress list must not be empty".to_string(),
        ));
    }
    if agents.len() > MAX_AGENTS {
        return Err(Error::Validation(format!(
            "{} agents exceed the maximum of {}",
            agents.len(),
            MAX_AGENTS
        )));
    }
    let mut seen = HashSet::new();
    for agent in agents {
        if !seen.insert(&agent.agent_id) {
            return Err(Error::Validation(format!(
                "duplicate agent id {}",
                agent.agent_id.as_str()
            )));
        }
        // The range check also rejects NaN.
        if !(0.0..=100.0).contains(&agent.percent_complete) {
            return Err(Error::Validation(format!(
                "agent {} reports percent_complete {} outside 0..=100",
                agent.agent_id.as_str(),
                agent.percent_complete
            )));
        }
    }
    Ok(())
}

/// Blocked or failed agents are always bottlenecks. A working run also
/// flags any agent trailing the mean by more than the lag threshold.
fn find_bottlenecks(agents: &[AgentProgress], mean: f64) -> Vec<Bottleneck> {
    let anyone_working = agents.iter().any(|a| a.status == AgentStatus::Working);
    let mut bottlenecks = Vec::new();
    for agent in agents {
        match agent.status {
            AgentStatus::Blocked => bottlenecks.push(Bottleneck {
                agent_id: agent.agent_id.clone(),
                reason: format!("blocked on task {}", agent.current_task),
            }),
            AgentStatus::Failed => bottlenecks.push(Bottleneck {
                agent_id: agent.agent_id.clone(),
                reason: format!("failed on task {}", agent.current_task),
            }),
            _ => {
                let others_working = anyone_working
                    && agents.iter().any(|other| {
                        other.agent_id != agent.agent_id && other.status == AgentStatus::Working
                    });
                if others_working && mean - agent.percent_complete > BOTTLENECK_LAG_POINTS {
                    bottlenecks.push(Bottleneck {
                        agent_id: agent.agent_id.clone(),
                        reason: format!(
                            "trailing overall progress by {:.0} points",
                            mean - agent.percent_complete
                        ),
                    });
                }
            }
        }
    }
    bottlenecks
}

/// Max remaining time across agents. Preference per agent: the explicit
/// estimate, then linear extrapolation from elapsed time, then a rough
/// upper bound scaled by the remaining fraction.
fn longest_remaining(agents: &[AgentProgress], now: DateTime<Utc>) -> Duration {
    let mut max_seconds = 0i64;
    for agent in agents {
        if matches!(agent.status, AgentStatus::Complete) {
            continue;
        }
        let remaining_fraction = (100.0 - agent.percent_complete) / 100.0;
        let minutes = if let Some(estimate) = agent.estimated_minutes_remaining {
            estimate.max(0.0)
        } else if let (Some(started), true) = (agent.started_at, agent.percent_complete > 0.0) {
            let elapsed_minutes = (now - started).num_seconds().max(0) as f64 / 60.0;
            elapsed_minutes * (100.0 - agent.percent_complete) / agent.percent_complete
        } else {
            f64::from(DEFAULT_TASK_MINUTES) * remaining_fraction
        };
        max_seconds = max_seconds.max((minutes * 60.0).round() as i64);
    }
    Duration::seconds(max_seconds)
}
