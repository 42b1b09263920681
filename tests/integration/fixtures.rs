//! Test fixtures for integration tests.
//!
//! Provides predefined task sets and a scripted execution fake that
//! walks a batch plan and produces deterministic agent results and
//! progress snapshots, standing in for a real execution layer.

use fanout::analysis::BatchPlan;
use fanout::{AgentProgress, AgentResult, AgentStatus, Task};

/// The three-task web feature: one model task unblocking an API task
/// and a UI task.
pub fn web_feature_tasks() -> Vec<Task> {
    vec![
        Task::new("1", "Create user model").with_minutes(20),
        Task::new("2", "Create user API").with_minutes(30).with_depends_on(["1"]),
        Task::new("3", "Create user UI").with_minutes(40).with_depends_on(["1"]),
    ]
}

/// `n` tasks with no dependencies and distinct descriptions.
pub fn independent_tasks(n: usize) -> Vec<Task> {
    (0..n)
        .map(|i| Task::new(format!("task-{}", i), format!("standalone unit {}", i)).with_minutes(15))
        .collect()
}

/// Three tasks forming a single declared cycle.
pub fn cyclic_tasks() -> Vec<Task> {
    vec![
        Task::new("a", "step a").with_depends_on(["c"]),
        Task::new("b", "step b").with_depends_on(["a"]),
        Task::new("c", "step c").with_depends_on(["b"]),
    ]
}

/// Deterministic fake execution of a batch plan.
///
/// Walks the batches in order, assigning each task in a batch to its
/// own agent (`agent-0`, `agent-1`, ...) and emitting successful
/// results in assignment order. Tasks listed in `failing` produce
/// failed results instead.
pub struct ScriptedRun {
    /// Results in completion order.
    pub results: Vec<AgentResult>,
    /// A mid-run progress snapshot: the final batch's agents are at
    /// 50%, everything earlier is complete.
    pub snapshot: Vec<AgentProgress>,
}

impl ScriptedRun {
    pub fn execute(plan: &BatchPlan, failing: &[&str]) -> Self {
        let mut results = Vec::new();
        let mut snapshot = Vec::new();
        let last_batch = plan.batches.len().saturating_sub(1);

        for (batch_index, batch) in plan.batches.iter().enumerate() {
            for (slot, task) in batch.tasks.iter().enumerate() {
                let agent = format!("agent-{}-{}", batch_index, slot);
                let failed = failing.contains(&task.id.as_str());
                let result = if failed {
                    AgentResult::failure(&agent, task.id.clone(), "scripted failure")
                } else {
                    AgentResult::success(&agent, task.id.clone())
                }
                .with_duration_ms(u64::from(task.minutes_or_default()) * 60_000);
                results.push(result);

                let progress = if batch_index == last_batch {
                    AgentProgress::new(&agent, task.id.clone(), 50.0)
                        .with_status(AgentStatus::Working)
                } else if failed {
                    AgentProgress::new(&agent, task.id.clone(), 0.0)
                        .with_status(AgentStatus::Failed)
                } else {
                    AgentProgress::new(&agent, task.id.clone(), 100.0)
                        .with_status(AgentStatus::Complete)
                };
                snapshot.push(progress);
            }
        }

        Self { results, snapshot }
    }
}
