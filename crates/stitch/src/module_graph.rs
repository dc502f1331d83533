//! Static require graph of a bundle
//!
//! The graph mirrors what the emitted loader will do at run time: it knows every registered
//! module and the literal `require("...")` specifiers each one issues. Specifiers are looked
//! up verbatim, exactly like the loader does, so a specifier that does not name a registered
//! id is reported here and will throw when the bundle runs.
//!
//! [`ModuleGraph::simulate`] replays the loader's three-state machine (registered,
//! evaluating, cached) from an entry point. It assumes every module requires all of its
//! dependencies at module scope, in source order, which is the common case for bundled
//! sources; requires hidden behind functions run later, or never, at run time.
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use crate::module::{Module, ModuleId};

/// Evaluation state of a module in the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Factory known, not yet invoked
    Registered,
    /// Factory running; requesters receive the exports object as it is being filled in
    Evaluating,
    /// Factory returned; exports are final
    Cached,
}

/// A `require` issued by one module for another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireEdge {
    /// Requesting module, `None` for the bootstrap call
    pub from: Option<ModuleId>,
    pub specifier: String,
}

/// Outcome of replaying the loader from an entry module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationTrace {
    /// Modules in the order their factories start running
    pub evaluation_order: Vec<ModuleId>,
    /// Re-entrant requires that were answered with a partially populated exports object
    pub partial_requires: Vec<RequireEdge>,
    /// Requires of ids that have no registration
    pub unregistered_requires: Vec<RequireEdge>,
    /// Registered modules the entry never reaches
    pub unreachable: Vec<ModuleId>,
}

#[derive(Debug)]
struct GraphNode {
    id: ModuleId,
    dependencies: Vec<String>,
}

#[derive(Debug)]
pub struct ModuleGraph {
    graph: DiGraph<GraphNode, ()>,
    index: FxHashMap<ModuleId, NodeIndex>,
}

impl ModuleGraph {
    pub fn from_modules<'a>(modules: impl IntoIterator<Item = &'a Module>) -> Self {
        let mut graph = DiGraph::new();
        let mut index = FxHashMap::default();

        for module in modules {
            let node = graph.add_node(GraphNode {
                id: module.id.clone(),
                dependencies: module.dependencies.clone(),
            });
            index.insert(module.id.clone(), node);
        }

        let edges: Vec<(NodeIndex, NodeIndex)> = graph
            .node_indices()
            .flat_map(|from| {
                graph[from]
                    .dependencies
                    .iter()
                    .filter_map(|specifier| index.get(specifier.as_str()))
                    .map(move |&to| (from, to))
                    .collect::<Vec<_>>()
            })
            .collect();
        for (from, to) in edges {
            graph.update_edge(from, to, ());
        }

        Self { graph, index }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Groups of modules that require each other, directly or transitively.
    ///
    /// Each group is sorted by id and the groups are sorted by their first id. A module
    /// that requires itself forms a group of one.
    pub fn cycles(&self) -> Vec<Vec<ModuleId>> {
        let mut cycles: Vec<Vec<ModuleId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| self.graph.contains_edge(node, node))
            })
            .map(|component| {
                let mut ids: Vec<ModuleId> = component
                    .into_iter()
                    .map(|node| self.graph[node].id.clone())
                    .collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Replay the loader starting with `require(entry)`.
    pub fn simulate(&self, entry: &str) -> EvaluationTrace {
        let mut simulation = LoaderSimulation {
            graph: self,
            states: self
                .index
                .values()
                .map(|&node| (node, ModuleState::Registered))
                .collect(),
            trace: EvaluationTrace::default(),
        };

        match self.index.get(entry) {
            Some(&node) => simulation.evaluate(node),
            None => simulation.trace.unregistered_requires.push(RequireEdge {
                from: None,
                specifier: entry.to_owned(),
            }),
        }

        let mut unreachable: Vec<ModuleId> = simulation
            .states
            .iter()
            .filter(|(_, state)| **state == ModuleState::Registered)
            .map(|(&node, _)| self.graph[node].id.clone())
            .collect();
        unreachable.sort();
        simulation.trace.unreachable = unreachable;
        simulation.trace
    }
}

struct LoaderSimulation<'a> {
    graph: &'a ModuleGraph,
    states: FxHashMap<NodeIndex, ModuleState>,
    trace: EvaluationTrace,
}

impl LoaderSimulation<'_> {
    /// Run the factory of a module in the `Registered` state
    fn evaluate(&mut self, node: NodeIndex) {
        let graph = self.graph;
        let module = &graph.graph[node];
        self.states.insert(node, ModuleState::Evaluating);
        self.trace.evaluation_order.push(module.id.clone());

        for specifier in &module.dependencies {
            self.require(&module.id, specifier);
        }

        self.states.insert(node, ModuleState::Cached);
    }

    fn require(&mut self, from: &ModuleId, specifier: &str) {
        let edge = || RequireEdge {
            from: Some(from.clone()),
            specifier: specifier.to_owned(),
        };

        let Some(&node) = self.graph.index.get(specifier) else {
            self.trace.unregistered_requires.push(edge());
            return;
        };

        match self.states.get(&node).copied() {
            Some(ModuleState::Registered) => self.evaluate(node),
            Some(ModuleState::Evaluating) => self.trace.partial_requires.push(edge()),
            Some(ModuleState::Cached) | None => {}
        }
    }
}
