//! End-to-end pipeline tests.
//!
//! Drives all five components in sequence over the same task set, the
//! way a real orchestrating caller would.

use fanout::analysis::{AggregationStrategy, AnalyzerConfig, OptimizationGoal};
use fanout::{
    aggregate_progress, analyze_parallelizability, build_dependency_graph, detect_conflicts,
    optimize_batches, ResolutionStrategy, TaskId,
};

use crate::fixtures::{cyclic_tasks, web_feature_tasks, ScriptedRun};

/// Test: The web feature scenario flows through the whole pipeline
/// Given the model/API/UI task set
/// When graph, batches, scripted execution, conflicts, and progress run in order
/// Then each stage produces the documented outcome
#[test]
fn test_web_feature_full_pipeline() {
    let tasks = web_feature_tasks();

    // Stage 1: graph.
    let analysis = build_dependency_graph(&tasks, true).unwrap();
    assert!(!analysis.has_cycles);
    assert_eq!(analysis.graph.task_count(), 3);
    assert_eq!(analysis.graph.dependency_count(), 2);

    // Stage 2: batches. Model first, then API and UI side by side.
    let plan = optimize_batches(&tasks, &analysis.graph, 2, OptimizationGoal::MinimizeTime)
        .unwrap();
    assert_eq!(plan.batches.len(), 2);
    assert_eq!(plan.batches[0].tasks[0].id, TaskId::new("1"));
    assert_eq!(plan.batches[1].tasks.len(), 2);
    // 20 minutes for the model, then max(30, 40) for the parallel pair.
    assert_eq!(plan.estimated_total_time, 60);

    // Stage 3: scripted execution completes in batch order.
    let run = ScriptedRun::execute(&plan, &[]);
    assert_eq!(run.results.len(), 3);

    // Stage 4: no conflicts from disjoint, in-order results.
    let report = detect_conflicts(&run.results, Some(&analysis.graph)).unwrap();
    assert!(!report.has_conflicts);
    assert_eq!(report.resolution_strategy, ResolutionStrategy::Auto);

    // Stage 5: the final batch's agents sit at 50%, the model task is done.
    let summary =
        aggregate_progress(&run.snapshot, AggregationStrategy::SimpleAverage, None).unwrap();
    assert!((summary.overall_progress - (100.0 + 50.0 + 50.0) / 3.0).abs() < 1e-9);
    assert!(summary.bottlenecks.is_empty());
}

/// Test: Analyzer ties the stages together
/// Given the web feature task set
/// When analyze_parallelizability runs with defaults
/// Then the verdict embeds the graph and suggested batches
#[test]
fn test_analyzer_embeds_graph_and_batches() {
    let tasks = web_feature_tasks();
    let result =
        analyze_parallelizability("Build user management", &tasks, &AnalyzerConfig::default())
            .unwrap();

    assert_eq!(result.analysis.graph.task_count(), 3);
    assert!(!result.suggested_batches.is_empty());
    // A single root task caps the independence bound at 0.5.
    assert!((result.estimated_speedup - 0.5).abs() < 1e-9);
    assert!(!result.parallelizable);
}

/// Test: A declared cycle stops the pipeline early
/// Given a three-task cycle
/// When the graph and analyzer stages run
/// Then cycles are reported as data and batching is refused
#[test]
fn test_cycle_blocks_batching() {
    let tasks = cyclic_tasks();

    let analysis = build_dependency_graph(&tasks, false).unwrap();
    assert!(analysis.has_cycles);
    assert_eq!(analysis.cycles.len(), 1);
    assert_eq!(analysis.cycles[0].len(), 3);

    let err = optimize_batches(&tasks, &analysis.graph, 2, OptimizationGoal::MinimizeTime)
        .unwrap_err();
    assert!(err.to_string().contains("cycle"));

    let verdict =
        analyze_parallelizability("cyclic work", &tasks, &AnalyzerConfig::default()).unwrap();
    assert!(!verdict.parallelizable);
    assert!(verdict.suggested_batches.is_empty());
}

/// Test: A failure mid-run surfaces as a rollback recommendation
/// Given the web feature plan where the model task fails
/// When the dependents' results still arrive
/// Then a critical dependency conflict recommends rollback
#[test]
fn test_failed_root_task_recommends_rollback() {
    let tasks = web_feature_tasks();
    let analysis = build_dependency_graph(&tasks, false).unwrap();
    let plan = optimize_batches(&tasks, &analysis.graph, 2, OptimizationGoal::MinimizeTime)
        .unwrap();

    let run = ScriptedRun::execute(&plan, &["1"]);
    let report = detect_conflicts(&run.results, Some(&analysis.graph)).unwrap();

    assert!(report.has_conflicts);
    assert_eq!(report.resolution_strategy, ResolutionStrategy::Rollback);
    assert!(report.merged_result.is_none());
}
