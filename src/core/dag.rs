//! Task dependency graph.
//!
//! TaskGraph wraps petgraph's DiGraph to represent declared task
//! dependencies. An edge `a -> b` means `a` must complete before `b`
//! can start. The graph holds only dependencies the caller declared;
//! heuristically inferred candidates are advisory data that live
//! outside it (see [`crate::analysis::implicit`]) and are never merged
//! in, so scheduling invariants rest on declared edges alone.

use crate::core::task::{Task, TaskId};
use crate::error::{Error, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

/// Node coloring for the cycle-enumeration DFS.
#[derive(Clone, Copy, PartialEq)]
enum Color {
    Unvisited,
    InProgress,
    Done,
}

/// The declared task dependency graph.
///
/// Built once per analysis call from a validated task list; never
/// shared or mutated concurrently. Nodes own cloned tasks and an index
/// maps [`TaskId`] to petgraph's `NodeIndex` for fast lookups.
pub struct TaskGraph {
    graph: DiGraph<Task, ()>,
    task_index: HashMap<TaskId, NodeIndex>,
}

impl TaskGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            task_index: HashMap::new(),
        }
    }

    /// Build a graph from an already-validated task list.
    ///
    /// Every task becomes a node; every `depends_on` entry becomes an
    /// edge from the dependency to the dependent. The result may be
    /// cyclic if the declared dependencies are; callers inspect that
    /// with [`TaskGraph::find_cycles`] rather than receiving an error,
    /// because cycle presence is meaningful output.
    pub fn from_tasks(tasks: &[Task]) -> Result<Self> {
        let mut dag = Self::new();
        for task in tasks {
            dag.add_task(task.clone());
        }
        for task in tasks {
            for dep in &task.depends_on {
                dag.add_dependency(dep, &task.id)?;
            }
        }
        Ok(dag)
    }

    /// Add a task node. Re-adding an existing id returns the original index.
    pub fn add_task(&mut self, task: Task) -> NodeIndex {
        if let Some(&index) = self.task_index.get(&task.id) {
            return index;
        }
        let id = task.id.clone();
        let index = self.graph.add_node(task);
        self.task_index.insert(id, index);
        index
    }

    /// Add a declared dependency edge: `from` must complete before `to`.
    pub fn add_dependency(&mut self, from: &TaskId, to: &TaskId) -> Result<()> {
        let from_index = *self
            .task_index
            .get(from)
            .ok_or_else(|| Error::Validation(format!("task {} not found in graph", from)))?;
        let to_index = *self
            .task_index
            .get(to)
            .ok_or_else(|| Error::Validation(format!("task {} not found in graph", to)))?;
        if self.graph.find_edge(from_index, to_index).is_none() {
            self.graph.add_edge(from_index, to_index, ());
        }
        Ok(())
    }

    /// Get a task by id.
    pub fn get_task(&self, id: &TaskId) -> Option<&Task> {
        self.task_index
            .get(id)
            .and_then(|&index| self.graph.node_weight(index))
    }

    /// Check whether a task id exists in the graph.
    pub fn contains_task(&self, id: &TaskId) -> bool {
        self.task_index.contains_key(id)
    }

    /// Number of task nodes.
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of declared dependency edges.
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check whether a declared edge `from -> to` exists.
    pub fn has_dependency(&self, from: &TaskId, to: &TaskId) -> bool {
        match (self.task_index.get(from), self.task_index.get(to)) {
            (Some(&f), Some(&t)) => self.graph.find_edge(f, t).is_some(),
            _ => false,
        }
    }

    /// All tasks, in insertion order.
    pub fn all_tasks(&self) -> Vec<&Task> {
        self.graph.node_weights().collect()
    }

    /// Ids of the tasks `id` depends on (incoming neighbors).
    pub fn predecessors(&self, id: &TaskId) -> Vec<TaskId> {
        self.neighbor_ids(id, Direction::Incoming)
    }

    /// Ids of the tasks that depend on `id` (outgoing neighbors).
    pub fn successors(&self, id: &TaskId) -> Vec<TaskId> {
        self.neighbor_ids(id, Direction::Outgoing)
    }

    fn neighbor_ids(&self, id: &TaskId, dir: Direction) -> Vec<TaskId> {
        match self.task_index.get(id) {
            Some(&index) => self
                .graph
                .neighbors_directed(index, dir)
                .filter_map(|n| self.graph.node_weight(n))
                .map(|t| t.id.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of declared dependencies of a task.
    pub fn in_degree(&self, id: &TaskId) -> usize {
        match self.task_index.get(id) {
            Some(&index) => self
                .graph
                .neighbors_directed(index, Direction::Incoming)
                .count(),
            None => 0,
        }
    }

    /// Ids of tasks with no declared dependencies, in insertion order.
    pub fn independent_tasks(&self) -> Vec<TaskId> {
        self.graph
            .node_indices()
            .filter(|&i| {
                self.graph
                    .neighbors_directed(i, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .filter_map(|i| self.graph.node_weight(i))
            .map(|t| t.id.clone())
            .collect()
    }

    /// Check whether the graph is free of cycles.
    pub fn is_acyclic(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Enumerate cycles via a three-color DFS.
    ///
    /// A back-edge to an in-progress node yields a cycle; the reported
    /// path is the DFS-stack segment from the back-edge's target to its
    /// source, inclusive. Multiple independent cycles are all reported,
    /// one per back-edge discovered.
    pub fn find_cycles(&self) -> Vec<Vec<TaskId>> {
        let mut colors: HashMap<NodeIndex, Color> = self
            .graph
            .node_indices()
            .map(|i| (i, Color::Unvisited))
            .collect();
        let mut stack: Vec<NodeIndex> = Vec::new();
        let mut cycles: Vec<Vec<TaskId>> = Vec::new();

        for start in self.graph.node_indices() {
            if colors[&start] == Color::Unvisited {
                self.dfs_cycles(start, &mut colors, &mut stack, &mut cycles);
            }
        }

        cycles
    }

    fn dfs_cycles(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        stack: &mut Vec<NodeIndex>,
        cycles: &mut Vec<Vec<TaskId>>,
    ) {
        colors.insert(node, Color::InProgress);
        stack.push(node);

        let mut neighbors: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        // petgraph iterates neighbors in reverse insertion order; restore
        // insertion order so cycle reports are deterministic.
        neighbors.reverse();

        for next in neighbors {
            match colors[&next] {
                Color::Unvisited => self.dfs_cycles(next, colors, stack, cycles),
                Color::InProgress => {
                    // Back-edge: the cycle runs from `next` up the stack to `node`.
                    if let Some(pos) = stack.iter().position(|&n| n == next) {
                        let cycle: Vec<TaskId> = stack[pos..]
                            .iter()
                            .filter_map(|&n| self.graph.node_weight(n))
                            .map(|t| t.id.clone())
                            .collect();
                        cycles.push(cycle);
                    }
                }
                Color::Done => {}
            }
        }

        stack.pop();
        colors.insert(node, Color::Done);
    }

    /// Topological layering: layer N holds the tasks whose declared
    /// predecessors all lie in strictly earlier layers. Layer 0 is the
    /// set of independent tasks.
    ///
    /// # Errors
    /// Returns a computation error if the graph is cyclic (the
    /// remaining tasks can never be placed).
    pub fn layers(&self) -> Result<Vec<Vec<TaskId>>> {
        let mut remaining_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|i| {
                (
                    i,
                    self.graph.neighbors_directed(i, Direction::Incoming).count(),
                )
            })
            .collect();

        let mut layers: Vec<Vec<TaskId>> = Vec::new();
        let mut placed = 0usize;

        while placed < self.graph.node_count() {
            let frontier: Vec<NodeIndex> = self
                .graph
                .node_indices()
                .filter(|i| remaining_degree.get(i) == Some(&0))
                .collect();

            if frontier.is_empty() {
                return Err(Error::Computation(
                    "cannot layer a cyclic graph".to_string(),
                ));
            }

            for &node in &frontier {
                remaining_degree.remove(&node);
                for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                    if let Some(d) = remaining_degree.get_mut(&next) {
                        *d = d.saturating_sub(1);
                    }
                }
            }

            placed += frontier.len();
            layers.push(
                frontier
                    .into_iter()
                    .filter_map(|i| self.graph.node_weight(i))
                    .map(|t| t.id.clone())
                    .collect(),
            );
        }

        Ok(layers)
    }

    /// The duration-weighted longest dependency chain.
    ///
    /// Returns the chain's task ids (in execution order) and its total
    /// minutes. Tasks without an estimate count as
    /// [`crate::core::task::DEFAULT_TASK_MINUTES`].
    ///
    /// # Errors
    /// Returns a computation error if the graph is cyclic.
    pub fn critical_path(&self) -> Result<(Vec<TaskId>, u64)> {
        let order = petgraph::algo::toposort(&self.graph, None).map_err(|cycle| {
            let id = self
                .graph
                .node_weight(cycle.node_id())
                .map(|t| t.id.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            Error::Computation(format!("cycle detected at task {}", id))
        })?;

        // cost[n] = best total minutes of a chain ending at n.
        let mut cost: HashMap<NodeIndex, u64> = HashMap::new();
        let mut best_prev: HashMap<NodeIndex, NodeIndex> = HashMap::new();

        for &node in &order {
            let own = self
                .graph
                .node_weight(node)
                .map(|t| u64::from(t.minutes_or_default()))
                .unwrap_or(0);
            let mut best = 0u64;
            let mut prev = None;
            for p in self.graph.neighbors_directed(node, Direction::Incoming) {
                let c = cost.get(&p).copied().unwrap_or(0);
                if c > best {
                    best = c;
                    prev = Some(p);
                }
            }
            cost.insert(node, best + own);
            if let Some(p) = prev {
                best_prev.insert(node, p);
            }
        }

        let Some((&end, &total)) = cost.iter().max_by(|a, b| {
            a.1.cmp(b.1)
                .then_with(|| b.0.index().cmp(&a.0.index()))
        }) else {
            return Ok((Vec::new(), 0));
        };

        let mut path = Vec::new();
        let mut current = end;
        loop {
            if let Some(task) = self.graph.node_weight(current) {
                path.push(task.id.clone());
            }
            match best_prev.get(&current) {
                Some(&p) => current = p,
                None => break,
            }
        }
        path.reverse();

        Ok((path, total))
    }

    /// Total minutes if every task ran strictly sequentially.
    pub fn sequential_minutes(&self) -> u64 {
        self.graph
            .node_weights()
            .map(|t| u64::from(t.minutes_or_default()))
            .sum()
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.task_count())
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}
