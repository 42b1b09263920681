//! Conflict detection over agent results.
//!
//! Four independent passes, unioned: file-level overlap, semantic
//! change inspection, dependency-order violations against the declared
//! graph, and shared external-resource mentions. Each conflict carries
//! preference-ordered resolution options, and the report recommends an
//! overall strategy.

use crate::analysis::implicit::resource_tokens;
use crate::core::dag::TaskGraph;
use crate::core::report::{AgentId, AgentResult, ChangeType, FileChange};
use crate::core::task::TaskId;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

/// Upper bound on results per detection call.
pub const MAX_RESULTS: usize = 100;

/// Conflict severity, ordered from least to most serious.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Which detection pass produced a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Two or more agents modified the same file.
    FileLevel,
    /// Detailed changes to the same file contradict each other.
    Semantic,
    /// A task ran although a declared predecessor failed.
    Dependency,
    /// A task completed before a declared predecessor.
    Ordering,
    /// Agents touched the same external resource without sharing a file.
    Resource,
}

/// A way to resolve a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionKind {
    /// Combine non-overlapping changes mechanically.
    Merge,
    /// Keep the earliest-completing agent's version.
    PreferAgent,
    /// Re-run the losing tasks one at a time.
    SequentialRetry,
    /// Discard all involved results.
    Rollback,
    /// A human decides.
    Manual,
}

/// One resolution option, in the conflict's preference order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOption {
    pub kind: ResolutionKind,
    /// Whether the option can be applied without a human in the loop.
    pub automatic: bool,
    pub description: String,
}

impl ResolutionOption {
    fn new(kind: ResolutionKind, automatic: bool, description: impl Into<String>) -> Self {
        Self {
            kind,
            automatic,
            description: description.into(),
        }
    }
}

/// Recommended handling for the result set as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Every conflict has an automatic option and none is critical.
    Auto,
    /// At least one conflict needs a human decision.
    Manual,
    /// A critical dependency violation poisons the result set.
    Rollback,
}

/// A single detected conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_type: ConflictType,
    pub severity: Severity,
    /// Agents involved, sorted by id.
    pub agents: Vec<AgentId>,
    /// The contested file, when the conflict is file-bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub description: String,
    /// Preference-ordered ways out.
    pub resolution_options: Vec<ResolutionOption>,
}

/// Mechanical merge of the non-conflicting portion of the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedResult {
    /// Union of every agent's modified files.
    pub files: BTreeSet<PathBuf>,
    /// Changes on uncontested files, in completion order.
    pub changes: Vec<FileChange>,
}

/// Output of [`detect_conflicts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub has_conflicts: bool,
    pub conflicts: Vec<Conflict>,
    pub resolution_strategy: ResolutionStrategy,
    /// Present only under the `Auto` strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_result: Option<MergedResult>,
}

/// Detects conflicts between concurrently produced agent results.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConflictDetector;

impl ConflictDetector {
    /// Create a detector.
    pub fn new() -> Self {
        Self
    }

    /// See [`detect_conflicts`].
    pub fn detect(
        &self,
        results: &[AgentResult],
        graph: Option<&TaskGraph>,
    ) -> Result<ConflictReport> {
        detect_conflicts(results, graph)
    }
}

/// Run all detection passes over `results`.
///
/// The slice order of `results` is treated as completion order. The
/// dependency and ordering passes only run when `graph` is supplied.
///
/// # Errors
/// `ValidationError` on an empty slice, more than 100 results, or a
/// result with an empty agent or task id.
pub fn detect_conflicts(
    results: &[AgentResult],
    graph: Option<&TaskGraph>,
) -> Result<ConflictReport> {
    validate_results(results)?;

    let mut conflicts = Vec::new();
    conflicts.extend(file_level_pass(results));
    conflicts.extend(semantic_pass(results));
    if let Some(graph) = graph {
        conflicts.extend(dependency_pass(results, graph));
    }
    conflicts.extend(resource_pass(results));

    let resolution_strategy = select_strategy(&conflicts);
    let merged_result = if resolution_strategy == ResolutionStrategy::Auto {
        Some(merge_results(results, &conflicts))
    } else {
        None
    };

    tracing::debug!(
        results = results.len(),
        conflicts = conflicts.len(),
        strategy = ?resolution_strategy,
        "conflict detection complete"
    );

    Ok(ConflictReport {
        has_conflicts: !conflicts.is_empty(),
        conflicts,
        resolution_strategy,
        merged_result,
    })
}

fn validate_results(results: &[AgentResult]) -> Result<()> {
    if results.is_empty() {
        return Err(Error::Validation(
            "agent result list must not be empty".to_string(),
        ));
    }
    if results.len() > MAX_RESULTS {
        return Err(Error::Validation(format!(
            "{} agent results exceed the maximum of {}",
            results.len(),
            MAX_RESULTS
        )));
    }
    for result in results {
        if result.agent_id.as_str().is_empty() {
            return Err(Error::Validation(
                "agent result has an empty agent_id".to_string(),
            ));
        }
        if result.task_id.as_str().is_empty() {
            return Err(Error::Validation(format!(
                "agent {} reported a result with an empty task_id",
                result.agent_id.as_str()
            )));
        }
    }
    Ok(())
}

/// One conflict per file touched by two or more distinct agents.
/// Severity scales with the crowd: two agents stay low or medium, three
/// or more rate high.
fn file_level_pass(results: &[AgentResult]) -> Vec<Conflict> {
    let mut by_file: BTreeMap<&PathBuf, BTreeSet<&AgentId>> = BTreeMap::new();
    for result in results {
        for file in &result.files_modified {
            by_file.entry(file).or_default().insert(&result.agent_id);
        }
    }

    let mut conflicts = Vec::new();
    for (file, agents) in by_file {
        if agents.len() < 2 {
            continue;
        }
        let detailed = agents.iter().all(|agent| {
            results
                .iter()
                .any(|r| &&r.agent_id == agent && has_change_for(r, file))
        });
        let severity = if agents.len() >= 3 {
            Severity::High
        } else if detailed {
            // Detailed changes exist; the semantic pass escalates real
            // collisions, so plain co-modification stays low.
            Severity::Low
        } else {
            Severity::Medium
        };
        let agent_list: Vec<AgentId> = agents.iter().map(|a| (*a).clone()).collect();
        let names: Vec<&str> = agent_list.iter().map(|a| a.as_str()).collect();
        let description = format!(
            "file {} was modified by {} agents: {}",
            file.display(),
            names.len(),
            names.join(", ")
        );
        let mut options = Vec::new();
        if severity <= Severity::Medium {
            if detailed {
                options.push(ResolutionOption::new(
                    ResolutionKind::Merge,
                    true,
                    "changes are detailed and can be merged mechanically",
                ));
            }
            options.push(ResolutionOption::new(
                ResolutionKind::PreferAgent,
                true,
                "keep the earliest completion",
            ));
        }
        options.push(ResolutionOption::new(
            ResolutionKind::SequentialRetry,
            false,
            "re-run the later tasks one at a time",
        ));
        options.push(ResolutionOption::new(
            ResolutionKind::Manual,
            false,
            "review the file by hand",
        ));
        conflicts.push(Conflict {
            conflict_type: ConflictType::FileLevel,
            severity,
            agents: agent_list,
            file: Some(file.clone()),
            description,
            resolution_options: options,
        });
    }
    conflicts
}

fn has_change_for(result: &AgentResult, file: &PathBuf) -> bool {
    result
        .changes
        .as_ref()
        .is_some_and(|changes| changes.iter().any(|c| &c.file == file))
}

/// Inspect detailed changes on shared files. A create plus delete from
/// different agents is critical; overlapping modify regions are high.
/// Results without `changes` simply contribute nothing here.
fn semantic_pass(results: &[AgentResult]) -> Vec<Conflict> {
    let mut by_file: BTreeMap<&PathBuf, Vec<(&AgentId, &FileChange)>> = BTreeMap::new();
    for result in results {
        if let Some(changes) = &result.changes {
            for change in changes {
                by_file
                    .entry(&change.file)
                    .or_default()
                    .push((&result.agent_id, change));
            }
        }
    }

    let mut conflicts = Vec::new();
    for (file, entries) in by_file {
        for (i, (agent_a, change_a)) in entries.iter().enumerate() {
            for (agent_b, change_b) in entries.iter().skip(i + 1) {
                if agent_a == agent_b {
                    continue;
                }
                let verdict = match (change_a.change_type, change_b.change_type) {
                    (ChangeType::Create, ChangeType::Delete)
                    | (ChangeType::Delete, ChangeType::Create) => Some((
                        Severity::Critical,
                        "one agent created the file while another deleted it",
                    )),
                    (ChangeType::Modify, ChangeType::Modify)
                        if change_a.lines_overlap(change_b) =>
                    {
                        Some((Severity::High, "modified regions overlap"))
                    }
                    _ => None,
                };
                if let Some((severity, why)) = verdict {
                    let mut agents = vec![(*agent_a).clone(), (*agent_b).clone()];
                    agents.sort();
                    conflicts.push(Conflict {
                        conflict_type: ConflictType::Semantic,
                        severity,
                        agents,
                        file: Some(file.clone()),
                        description: format!("in {}: {}", file.display(), why),
                        resolution_options: vec![
                            ResolutionOption::new(
                                ResolutionKind::SequentialRetry,
                                false,
                                "re-run one of the tasks against the other's output",
                            ),
                            ResolutionOption::new(
                                ResolutionKind::Manual,
                                false,
                                "reconcile the contradictory changes by hand",
                            ),
                        ],
                    });
                }
            }
        }
    }
    conflicts
}

/// Check completion order against declared predecessors. A dependent
/// that ran after its predecessor failed is critical; a dependent that
/// finished before its predecessor is an ordering violation.
fn dependency_pass(results: &[AgentResult], graph: &TaskGraph) -> Vec<Conflict> {
    let position: HashMap<&TaskId, usize> = results
        .iter()
        .enumerate()
        .map(|(i, r)| (&r.task_id, i))
        .collect();
    let by_task: HashMap<&TaskId, &AgentResult> =
        results.iter().map(|r| (&r.task_id, r)).collect();

    let mut conflicts = Vec::new();
    for result in results {
        if !graph.contains_task(&result.task_id) {
            continue;
        }
        for predecessor in graph.predecessors(&result.task_id) {
            let Some(pred_result) = by_task.get(&predecessor) else {
                continue;
            };
            if !pred_result.success {
                let mut agents = vec![result.agent_id.clone(), pred_result.agent_id.clone()];
                agents.sort();
                agents.dedup();
                conflicts.push(Conflict {
                    conflict_type: ConflictType::Dependency,
                    severity: Severity::Critical,
                    agents,
                    file: None,
                    description: format!(
                        "task {} ran although its dependency {} failed{}",
                        result.task_id,
                        predecessor,
                        pred_result
                            .error
                            .as_deref()
                            .map(|e| format!(": {}", e))
                            .unwrap_or_default()
                    ),
                    resolution_options: vec![
                        ResolutionOption::new(
                            ResolutionKind::Rollback,
                            false,
                            "discard both results and replan",
                        ),
                        ResolutionOption::new(
                            ResolutionKind::SequentialRetry,
                            false,
                            "retry the failed dependency, then its dependents",
                        ),
                        ResolutionOption::new(
                            ResolutionKind::Manual,
                            false,
                            "inspect whether the dependent's output is usable",
                        ),
                    ],
                });
            } else if position[&predecessor] > position[&result.task_id] {
                let mut agents = vec![result.agent_id.clone(), pred_result.agent_id.clone()];
                agents.sort();
                agents.dedup();
                conflicts.push(Conflict {
                    conflict_type: ConflictType::Ordering,
                    severity: Severity::High,
                    agents,
                    file: None,
                    description: format!(
                        "task {} completed before its dependency {}",
                        result.task_id, predecessor
                    ),
                    resolution_options: vec![
                        ResolutionOption::new(
                            ResolutionKind::SequentialRetry,
                            false,
                            "re-run the dependent now that its dependency has finished",
                        ),
                        ResolutionOption::new(
                            ResolutionKind::Manual,
                            false,
                            "verify the dependent did not need the dependency's output",
                        ),
                    ],
                });
            }
        }
    }
    conflicts
}

/// Flag agent pairs whose change content mentions the same external
/// resource although they share no file. Weaker signal than a file
/// collision, so severity stays low.
fn resource_pass(results: &[AgentResult]) -> Vec<Conflict> {
    let tokens: Vec<BTreeSet<String>> = results
        .iter()
        .map(|r| {
            let mut set = BTreeSet::new();
            if let Some(changes) = &r.changes {
                for change in changes {
                    if let Some(content) = &change.content {
                        set.extend(resource_tokens(content));
                    }
                }
            }
            set
        })
        .collect();

    let mut conflicts = Vec::new();
    for i in 0..results.len() {
        for j in (i + 1)..results.len() {
            let (a, b) = (&results[i], &results[j]);
            if a.agent_id == b.agent_id {
                continue;
            }
            if a.files_modified.intersection(&b.files_modified).next().is_some() {
                continue;
            }
            let shared: Vec<&String> = tokens[i].intersection(&tokens[j]).collect();
            if shared.is_empty() {
                continue;
            }
            let mut agents = vec![a.agent_id.clone(), b.agent_id.clone()];
            agents.sort();
            conflicts.push(Conflict {
                conflict_type: ConflictType::Resource,
                severity: Severity::Low,
                agents,
                file: None,
                description: format!(
                    "agents {} and {} both touch resource {}",
                    a.agent_id.as_str(),
                    b.agent_id.as_str(),
                    shared[0]
                ),
                resolution_options: vec![
                    ResolutionOption::new(
                        ResolutionKind::PreferAgent,
                        true,
                        "keep the earliest completion's resource state",
                    ),
                    ResolutionOption::new(
                        ResolutionKind::SequentialRetry,
                        false,
                        "serialize the two tasks",
                    ),
                    ResolutionOption::new(
                        ResolutionKind::Manual,
                        false,
                        "check the resource for contradictory writes",
                    ),
                ],
            });
        }
    }
    conflicts
}

fn select_strategy(conflicts: &[Conflict]) -> ResolutionStrategy {
    let critical_dependency = conflicts.iter().any(|c| {
        c.conflict_type == ConflictType::Dependency && c.severity == Severity::Critical
    });
    if critical_dependency {
        return ResolutionStrategy::Rollback;
    }
    let any_critical = conflicts.iter().any(|c| c.severity == Severity::Critical);
    let all_automatic = conflicts
        .iter()
        .all(|c| c.resolution_options.iter().any(|o| o.automatic));
    if !any_critical && all_automatic {
        ResolutionStrategy::Auto
    } else {
        ResolutionStrategy::Manual
    }
}

/// Union all modified files; carry over only changes on files no
/// conflict names, in completion order.
fn merge_results(results: &[AgentResult], conflicts: &[Conflict]) -> MergedResult {
    let contested: BTreeSet<&PathBuf> =
        conflicts.iter().filter_map(|c| c.file.as_ref()).collect();

    let mut files = BTreeSet::new();
    let mut changes = Vec::new();
    for result in results {
        files.extend(result.files_modified.iter().cloned());
        if let Some(result_changes) = &result.changes {
            for change in result_changes {
                if !contested.contains(&change.file) {
                    changes.push(change.clone());
                }
            }
        }
    }
    MergedResult { files, changes }
}
