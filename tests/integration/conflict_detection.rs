//! Conflict detection over simulated agent results.

use fanout::analysis::{ConflictType, ResolutionKind, Severity};
use fanout::{
    build_dependency_graph, detect_conflicts, AgentResult, ChangeType, FileChange,
    ResolutionStrategy,
};

use crate::fixtures::web_feature_tasks;

/// Test: Disjoint work merges automatically
/// Given two agents touching different files
/// When conflicts are detected
/// Then the report is clean and carries a merged result
#[test]
fn test_disjoint_work_is_clean() {
    let results = vec![
        AgentResult::success("agent-1", "2")
            .with_file("src/api/users.rs")
            .with_changes(vec![FileChange::new("src/api/users.rs", ChangeType::Create)]),
        AgentResult::success("agent-2", "3")
            .with_file("src/ui/users.rs")
            .with_changes(vec![FileChange::new("src/ui/users.rs", ChangeType::Create)]),
    ];

    let report = detect_conflicts(&results, None).unwrap();
    assert!(!report.has_conflicts);
    assert_eq!(report.resolution_strategy, ResolutionStrategy::Auto);
    let merged = report.merged_result.unwrap();
    assert_eq!(merged.files.len(), 2);
    assert_eq!(merged.changes.len(), 2);
}

/// Test: A shared file names both agents
/// Given two agents writing the same file without detailed changes
/// When conflicts are detected
/// Then one file-level conflict lists both agents with an automatic option
#[test]
fn test_shared_file_conflict_names_both_agents() {
    let results = vec![
        AgentResult::success("agent-1", "2").with_file("src/routes.rs"),
        AgentResult::success("agent-2", "3").with_file("src/routes.rs"),
    ];

    let report = detect_conflicts(&results, None).unwrap();
    assert!(report.has_conflicts);
    assert_eq!(report.conflicts.len(), 1);
    let conflict = &report.conflicts[0];
    assert_eq!(conflict.conflict_type, ConflictType::FileLevel);
    assert_eq!(conflict.agents.len(), 2);
    assert!(conflict
        .resolution_options
        .iter()
        .any(|o| o.kind == ResolutionKind::PreferAgent && o.automatic));
}

/// Test: Strategy escalates with severity
/// Given overlapping detailed edits versus disjoint ones
/// When conflicts are detected
/// Then disjoint edits stay auto while overlapping edits go manual
#[test]
fn test_strategy_tracks_severity() {
    let disjoint = vec![
        AgentResult::success("agent-1", "2")
            .with_file("src/lib.rs")
            .with_changes(vec![
                FileChange::new("src/lib.rs", ChangeType::Modify).with_lines(1, 10)
            ]),
        AgentResult::success("agent-2", "3")
            .with_file("src/lib.rs")
            .with_changes(vec![
                FileChange::new("src/lib.rs", ChangeType::Modify).with_lines(40, 50)
            ]),
    ];
    let overlapping = vec![
        AgentResult::success("agent-1", "2")
            .with_file("src/lib.rs")
            .with_changes(vec![
                FileChange::new("src/lib.rs", ChangeType::Modify).with_lines(1, 20)
            ]),
        AgentResult::success("agent-2", "3")
            .with_file("src/lib.rs")
            .with_changes(vec![
                FileChange::new("src/lib.rs", ChangeType::Modify).with_lines(10, 30)
            ]),
    ];

    let clean = detect_conflicts(&disjoint, None).unwrap();
    assert_eq!(clean.resolution_strategy, ResolutionStrategy::Auto);

    let dirty = detect_conflicts(&overlapping, None).unwrap();
    assert_eq!(dirty.resolution_strategy, ResolutionStrategy::Manual);
    assert!(dirty
        .conflicts
        .iter()
        .any(|c| c.conflict_type == ConflictType::Semantic && c.severity == Severity::High));
}

/// Test: Dependency order is enforced against the declared graph
/// Given results arriving before their declared predecessor
/// When conflicts are detected with the graph supplied
/// Then an ordering conflict is raised, and none without the graph
#[test]
fn test_ordering_needs_the_graph() {
    let tasks = web_feature_tasks();
    let analysis = build_dependency_graph(&tasks, false).unwrap();

    // Task 2 completes before its dependency, task 1.
    let results = vec![
        AgentResult::success("agent-2", "2"),
        AgentResult::success("agent-1", "1"),
    ];

    let with_graph = detect_conflicts(&results, Some(&analysis.graph)).unwrap();
    assert!(with_graph
        .conflicts
        .iter()
        .any(|c| c.conflict_type == ConflictType::Ordering));

    let without_graph = detect_conflicts(&results, None).unwrap();
    assert!(!without_graph.has_conflicts);
}
