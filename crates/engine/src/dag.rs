//! Dependency graph: explicit connections merged with implicit
//! parameter-reference edges.
//!
//! Three consumers share one [`DependencyGraph`]:
//! 1. the cycle check that guards every run (full graph),
//! 2. the reachability resolver that scopes a run to its started triggers,
//! 3. [`validate_dag`], the static check used before persisting a workflow.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::{models::Workflow, EngineError};

/// Adjacency and in-degree over **all** nodes of a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    adjacency: HashMap<String, Vec<String>>,
    in_degree: HashMap<String, usize>,
}

impl DependencyGraph {
    /// Build the combined graph.
    ///
    /// Self-loops are dropped, duplicates count once, and edges touching an
    /// unknown node id are ignored.
    pub fn build(workflow: &Workflow) -> Self {
        let mut graph = Self {
            adjacency: HashMap::new(),
            in_degree: HashMap::new(),
        };

        for node in &workflow.nodes {
            graph.adjacency.entry(node.id.clone()).or_default();
            graph.in_degree.entry(node.id.clone()).or_insert(0);
        }

        for connection in &workflow.connections {
            graph.add_edge(&connection.source_node_id, &connection.target_node_id);
        }

        // A node that reads another node's result depends on it.
        for node in &workflow.nodes {
            for source in node.references() {
                graph.add_edge(source, &node.id);
            }
        }

        graph
    }

    fn add_edge(&mut self, source: &str, target: &str) {
        if source == target || !self.in_degree.contains_key(target) {
            return;
        }
        let Some(targets) = self.adjacency.get_mut(source) else {
            return;
        };
        if targets.iter().any(|t| t == target) {
            return;
        }
        targets.push(target.to_owned());
        if let Some(degree) = self.in_degree.get_mut(target) {
            *degree += 1;
        }
    }

    pub fn adjacency(&self) -> &HashMap<String, Vec<String>> {
        &self.adjacency
    }

    pub fn in_degree(&self) -> &HashMap<String, usize> {
        &self.in_degree
    }

    /// Direct successors of `node_id`, in insertion order.
    pub fn successors(&self, node_id: &str) -> &[String] {
        self.adjacency
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Three-color DFS over every node; `true` if any edge reaches a node
    /// that is still in progress.
    ///
    /// The walk keeps an explicit stack of (node, next successor index), so
    /// long chains do not grow the call stack.
    pub fn has_cycle<'a>(&self, node_ids: impl IntoIterator<Item = &'a str>) -> bool {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Visit {
            InProgress,
            Done,
        }

        let mut state: HashMap<&str, Visit> = HashMap::new();
        let mut stack: Vec<(&str, usize)> = Vec::new();

        for node_id in node_ids {
            let Some((root, _)) = self.adjacency.get_key_value(node_id) else {
                continue;
            };
            if state.contains_key(root.as_str()) {
                continue;
            }

            state.insert(root.as_str(), Visit::InProgress);
            stack.push((root.as_str(), 0));

            while let Some(frame) = stack.last_mut() {
                let (current, index) = *frame;
                let Some(next) = self.successors(current).get(index) else {
                    state.insert(current, Visit::Done);
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                match state.get(next.as_str()) {
                    Some(Visit::InProgress) => return true,
                    Some(Visit::Done) => {}
                    None => {
                        state.insert(next.as_str(), Visit::InProgress);
                        stack.push((next.as_str(), 0));
                    }
                }
            }
        }
        false
    }

    /// In-scope node set for a run started from `start_ids`.
    ///
    /// Forward BFS from the starts, then the ancestor closure of that forward
    /// set over the reverse adjacency.  Ancestors that are un-started triggers
    /// are neutralized later by the scheduler's incoming-edge filter.
    pub fn reachable_from<'a>(
        &self,
        start_ids: impl IntoIterator<Item = &'a str>,
    ) -> HashSet<String> {
        let mut forward: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        for id in start_ids {
            if forward.insert(id.to_owned()) {
                queue.push_back(id.to_owned());
            }
        }
        while let Some(current) = queue.pop_front() {
            for next in self.successors(&current) {
                if forward.insert(next.clone()) {
                    queue.push_back(next.clone());
                }
            }
        }

        let mut reverse: HashMap<&str, Vec<&str>> = HashMap::new();
        for (source, targets) in &self.adjacency {
            for target in targets {
                reverse.entry(target.as_str()).or_default().push(source.as_str());
            }
        }

        let mut visited = forward.clone();
        let mut queue: VecDeque<String> = forward.into_iter().collect();
        while let Some(current) = queue.pop_front() {
            for &prev in reverse.get(current.as_str()).into_iter().flatten() {
                if visited.insert(prev.to_owned()) {
                    queue.push_back(prev.to_owned());
                }
            }
        }

        visited
    }
}

/// Validate the workflow's graph and return nodes in topological order.
///
/// Rules enforced:
/// 1. Node IDs must be unique within the workflow.
/// 2. Every connection and parameter reference must name an existing node.
/// 3. The combined graph must be acyclic (topological sort must succeed).
///
/// The executor itself stays tolerant of rule 2; this is the strict check a
/// definition layer runs before accepting a workflow.
///
/// # Errors
/// - [`EngineError::DuplicateNodeId`] if two nodes share an ID.
/// - [`EngineError::UnknownNodeReference`] if a connection or reference is dangling.
/// - [`EngineError::CycleDetected`] if the graph is not acyclic.
pub fn validate_dag(workflow: &Workflow) -> Result<Vec<String>, EngineError> {
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for node in &workflow.nodes {
        if !seen_ids.insert(node.id.as_str()) {
            return Err(EngineError::DuplicateNodeId(node.id.clone()));
        }
    }

    for connection in &workflow.connections {
        for (node_id, side) in [
            (&connection.source_node_id, "connection source"),
            (&connection.target_node_id, "connection target"),
        ] {
            if !seen_ids.contains(node_id.as_str()) {
                return Err(EngineError::UnknownNodeReference {
                    node_id: node_id.clone(),
                    side,
                });
            }
        }
    }

    for node in &workflow.nodes {
        if let Some(missing) = node.references().into_iter().find(|r| !seen_ids.contains(r)) {
            return Err(EngineError::UnknownNodeReference {
                node_id: missing.to_owned(),
                side: "parameter reference",
            });
        }
    }

    // Kahn's algorithm, seeded in declaration order.
    let graph = DependencyGraph::build(workflow);
    let mut in_degree = graph.in_degree.clone();
    let mut queue: VecDeque<&str> = workflow
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| in_degree.get(*id) == Some(&0))
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(workflow.nodes.len());
    while let Some(node_id) = queue.pop_front() {
        sorted.push(node_id.to_owned());
        for next in graph.successors(node_id) {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    // If we didn't visit every node the graph contains a cycle.
    if sorted.len() != workflow.nodes.len() {
        return Err(EngineError::CycleDetected);
    }

    Ok(sorted)
}
