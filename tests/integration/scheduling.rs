//! Batch planning invariants across optimization goals.

use fanout::analysis::OptimizationGoal;
use fanout::{build_dependency_graph, optimize_batches, Task};

use crate::fixtures::{independent_tasks, web_feature_tasks};

const ALL_GOALS: [OptimizationGoal; 3] = [
    OptimizationGoal::MinimizeTime,
    OptimizationGoal::BalanceLoad,
    OptimizationGoal::MinimizeConflicts,
];

/// Test: Every goal honors the structural invariants
/// Given a mixed dependent/independent task set
/// When plans are produced under each goal
/// Then no batch exceeds the agent budget, every task appears exactly
/// once, and no batch contains a dependent pair
#[test]
fn test_invariants_hold_for_every_goal() {
    let mut tasks = web_feature_tasks();
    tasks.extend(independent_tasks(5));
    let analysis = build_dependency_graph(&tasks, false).unwrap();

    for goal in ALL_GOALS {
        let plan = optimize_batches(&tasks, &analysis.graph, 3, goal).unwrap();

        let mut seen = Vec::new();
        for batch in &plan.batches {
            assert!(batch.tasks.len() <= 3, "{:?}: batch over budget", goal);
            for task in &batch.tasks {
                assert!(!seen.contains(&task.id), "{:?}: task duplicated", goal);
                seen.push(task.id.clone());
                for other in &batch.tasks {
                    assert!(
                        !analysis.graph.has_dependency(&task.id, &other.id),
                        "{:?}: dependent pair batched together",
                        goal
                    );
                }
            }
        }
        assert_eq!(seen.len(), tasks.len(), "{:?}: task lost", goal);
    }
}

/// Test: Zero agents is rejected before any planning
/// Given a valid task set
/// When the agent budget is zero
/// Then a validation error cites the minimum of one
#[test]
fn test_zero_agents_rejected() {
    let tasks = web_feature_tasks();
    let analysis = build_dependency_graph(&tasks, false).unwrap();
    let err = optimize_batches(&tasks, &analysis.graph, 0, OptimizationGoal::BalanceLoad)
        .unwrap_err();
    assert!(err.to_string().contains("at least 1"));
}

/// Test: Serial chains cost their full duration under every goal
/// Given a strict three-task chain
/// When any goal plans it
/// Then total time is the sum of all durations and batches are singletons
#[test]
fn test_chain_costs_full_duration() {
    let tasks = vec![
        Task::new("a", "first").with_minutes(10),
        Task::new("b", "second").with_minutes(20).with_depends_on(["a"]),
        Task::new("c", "third").with_minutes(30).with_depends_on(["b"]),
    ];
    let analysis = build_dependency_graph(&tasks, false).unwrap();

    for goal in ALL_GOALS {
        let plan = optimize_batches(&tasks, &analysis.graph, 4, goal).unwrap();
        assert_eq!(plan.batches.len(), 3);
        assert_eq!(plan.estimated_total_time, 60);
        assert!(plan.batches.iter().all(|b| b.tasks.len() == 1));
    }
}

/// Test: Wider budgets never slow the plan down
/// Given eight independent tasks
/// When budgets of 2, 4, and 8 plan them under minimize-time
/// Then estimated total time is non-increasing as the budget grows
#[test]
fn test_more_agents_never_slower() {
    let tasks = independent_tasks(8);
    let analysis = build_dependency_graph(&tasks, false).unwrap();

    let mut previous = u64::MAX;
    for budget in [2, 4, 8] {
        let plan =
            optimize_batches(&tasks, &analysis.graph, budget, OptimizationGoal::MinimizeTime)
                .unwrap();
        assert!(plan.estimated_total_time <= previous);
        previous = plan.estimated_total_time;
    }
}

/// Test: Plans are reproducible
/// Given the same inputs
/// When the optimizer runs twice
/// Then the plans are identical, batch ids included
#[test]
fn test_plans_are_deterministic() {
    let mut tasks = web_feature_tasks();
    tasks.extend(independent_tasks(4));
    let analysis = build_dependency_graph(&tasks, false).unwrap();

    for goal in ALL_GOALS {
        let a = optimize_batches(&tasks, &analysis.graph, 3, goal).unwrap();
        let b = optimize_batches(&tasks, &analysis.graph, 3, goal).unwrap();
        assert_eq!(a, b);
    }
}
