pub mod batch;
pub mod builder;
pub mod conflict;
pub mod implicit;
pub mod parallel;
pub mod progress;

pub use batch::{optimize_batches, Batch, BatchOptimizer, BatchPlan, OptimizationGoal};
pub use builder::{build_dependency_graph, GraphAnalysis, GraphBuilder};
pub use conflict::{
    detect_conflicts, Conflict, ConflictDetector, ConflictReport, ConflictType, MergedResult,
    ResolutionKind, ResolutionOption, ResolutionStrategy, Severity,
};
pub use implicit::{CrudVerb, ImplicitDependency, ImplicitSignal};
pub use parallel::{
    analyze_parallelizability, AnalyzerConfig, ParallelAnalysis, ParallelizabilityAnalyzer, Risk,
    RiskKind,
};
pub use progress::{
    aggregate_progress, AggregationStrategy, Bottleneck, ProgressAggregator, ProgressSummary,
};
