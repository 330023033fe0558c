//! Cycle detection
//!
//! Two independent graphs are checked:
//! - units definitions and the units they reference (directed)
//! - variables and their equivalence links (undirected)

use std::collections::{HashMap, HashSet};

use petgraph::algo::{all_simple_paths, tarjan_scc};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::models::{Model, VariableId};

/// A units definition whose expansion returns to itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitsCycle {
    /// Units names; the first and last entries are equal
    pub path: Vec<String>,
}

impl UnitsCycle {
    /// `'a' -> 'b' -> 'a'`
    pub fn description(&self) -> String {
        self.path
            .iter()
            .map(|name| format!("'{}'", name))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// A closed loop of equivalence links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalenceCycle {
    /// Variables in loop order; the first and last entries are equal
    pub variables: Vec<VariableId>,
}

impl EquivalenceCycle {
    /// `('c1', 'x') -> ('c2', 'y') -> ('c1', 'x')`
    pub fn description(&self, model: &Model) -> String {
        self.variables
            .iter()
            .map(|id| {
                let variable = model.variable(*id);
                format!("('{}', '{}')", model.component(variable.component).name, variable.name)
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Number of distinct variables in the loop
    pub fn len(&self) -> usize {
        self.variables.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Every units definition whose references lead back to it
///
/// A path that revisits some other definition without returning to its
/// start is not reported for the start. Paths are only enumerated inside
/// strongly connected groups of two or more definitions; the enumeration
/// is exponential in the size of such a group, which stays small in real
/// models.
pub fn find_units_cycles(model: &Model) -> Vec<UnitsCycle> {
    let mut graph = DiGraph::<String, ()>::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
    for units in model.units() {
        nodes
            .entry(units.name.as_str())
            .or_insert_with(|| graph.add_node(units.name.clone()));
    }

    let mut successors: Vec<(NodeIndex, Vec<NodeIndex>)> = Vec::new();
    for units in model.units() {
        let from = nodes[units.name.as_str()];
        if successors.iter().any(|(n, _)| *n == from) {
            continue;
        }
        let mut targets = Vec::new();
        for unit in units.units() {
            if let Some(&to) = nodes.get(unit.reference.as_str())
                && !targets.contains(&to)
            {
                graph.add_edge(from, to, ());
                targets.push(to);
            }
        }
        successors.push((from, targets));
    }

    let mut group: HashMap<NodeIndex, usize> = HashMap::new();
    for (index, members) in tarjan_scc(&graph).into_iter().enumerate() {
        if members.len() > 1 {
            group.extend(members.into_iter().map(|n| (n, index)));
        }
    }

    let mut cycles = Vec::new();
    for (start, targets) in &successors {
        for next in targets {
            if next == start {
                cycles.push(UnitsCycle {
                    path: vec![graph[*start].clone(), graph[*start].clone()],
                });
                continue;
            }
            if group.get(start).is_none() || group.get(start) != group.get(next) {
                continue;
            }
            let paths = all_simple_paths::<Vec<NodeIndex>, _>(&graph, *next, *start, 0, None);
            for path in paths {
                let mut names = vec![graph[*start].clone()];
                names.extend(path.iter().map(|n| graph[*n].clone()));
                cycles.push(UnitsCycle { path: names });
            }
        }
    }
    cycles
}

struct Walk {
    node: NodeIndex,
    via: EdgeIndex,
    path: Vec<NodeIndex>,
}

/// Every closed loop in the equivalence graph, each reported once
///
/// A loop is reported from its member with the smallest
/// `(component name, variable name)`, and a loop found in both directions
/// is kept only once.
pub fn find_equivalence_cycles(model: &Model) -> Vec<EquivalenceCycle> {
    let mut graph = UnGraph::<VariableId, ()>::new_undirected();
    let mut nodes: HashMap<VariableId, NodeIndex> = HashMap::new();
    for (id, variable) in model.variables() {
        if !variable.equivalences.is_empty() {
            nodes.insert(id, graph.add_node(id));
        }
    }
    for (id, variable) in model.variables() {
        for link in &variable.equivalences {
            if id < link.variable
                && let (Some(&a), Some(&b)) = (nodes.get(&id), nodes.get(&link.variable))
            {
                graph.add_edge(a, b, ());
            }
        }
    }

    let key = |node: NodeIndex| {
        let id = graph[node];
        let variable = model.variable(id);
        (
            model.component(variable.component).name.as_str(),
            variable.name.as_str(),
            id,
        )
    };

    let mut seen: HashSet<Vec<NodeIndex>> = HashSet::new();
    let mut cycles = Vec::new();

    for start in graph.node_indices() {
        if graph.edges(start).count() < 2 {
            continue;
        }
        let start_key = key(start);

        let mut stack: Vec<Walk> = graph
            .edges(start)
            .map(|edge| Walk {
                node: other_end(edge.source(), edge.target(), start),
                via: edge.id(),
                path: vec![start],
            })
            .collect();
        stack.reverse();

        while let Some(walk) = stack.pop() {
            let mut path = walk.path;
            if let Some(position) = path.iter().position(|n| *n == walk.node) {
                let mut closed = path.split_off(position);
                closed.push(walk.node);
                if closed[0] != start || closed.iter().any(|n| key(*n) < start_key) {
                    continue;
                }
                let mut reversed = closed.clone();
                reversed.reverse();
                let canonical = closed.clone().min(reversed);
                if seen.insert(canonical) {
                    cycles.push(EquivalenceCycle {
                        variables: closed.iter().map(|n| graph[*n]).collect(),
                    });
                }
                continue;
            }

            path.push(walk.node);
            let mut next: Vec<Walk> = graph
                .edges(walk.node)
                .filter(|edge| edge.id() != walk.via)
                .map(|edge| Walk {
                    node: other_end(edge.source(), edge.target(), walk.node),
                    via: edge.id(),
                    path: path.clone(),
                })
                .collect();
            next.reverse();
            stack.extend(next);
        }
    }
    cycles
}

fn other_end(source: NodeIndex, target: NodeIndex, from: NodeIndex) -> NodeIndex {
    if source == from { target } else { source }
}
