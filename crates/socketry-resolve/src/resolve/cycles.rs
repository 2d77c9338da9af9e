//! Dependency cycle detection.
//!
//! Builds the construction graph of a resolved module and finds cycles that
//! would make eager construction impossible.
//!
//! # Graph
//!
//! Nodes are beans (local, nested and component beans) and boundary sockets
//! (the module's socket beans, mutating and overriding sockets of local
//! beans, and component sockets). Edges:
//!
//! - bean → bound bean, for every resolved socket (lazy if the socket is lazy)
//! - component socket → bound bean
//! - nested bean → its provider
//! - mutator or overridable bean → its own boundary socket
//! - component bean → each component socket its export says it reaches
//!
//! # Cycles
//!
//! Only eager edges are followed, so every cycle found is illegal: a cycle
//! with at least one lazy edge is never reported. Strongly connected
//! components (Tarjan) of the eager subgraph decide which beans are faulty;
//! elementary cycles inside each component are enumerated for diagnostics.
//! Overlapping cycles are all reported. Nodes are sorted, which keeps the
//! output stable across runs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use socketry_model::{
    Diagnostic, DiagnosticKind, DiagnosticSink, Identifier, Module, QualifiedName,
};

use super::scope::{CandidateOrigin, ModuleScope, SocketOwner};
use super::sockets::SocketBinding;

/// A node of the construction graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    Bean(QualifiedName),
    Boundary(QualifiedName),
}

impl NodeId {
    pub fn name(&self) -> &QualifiedName {
        match self {
            NodeId::Bean(name) | NodeId::Boundary(name) => name,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Bean(name) => write!(f, "{}", name),
            NodeId::Boundary(name) => write!(f, "{} (socket)", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    to: NodeId,
    /// Socket site the edge goes through, if any
    via: Option<QualifiedName>,
    lazy: bool,
}

/// One member of a cycle and the socket leading to the next member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleStep {
    pub node: NodeId,
    pub socket: Option<QualifiedName>,
}

/// An eager dependency cycle; the last step leads back to the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    pub steps: Vec<CycleStep>,
}

impl Cycle {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.steps.iter().map(|s| &s.node)
    }

    /// Beans of `module` taking part in the cycle.
    pub fn local_beans<'a>(
        &'a self,
        module: &'a Identifier,
    ) -> impl Iterator<Item = &'a QualifiedName> + 'a {
        self.nodes().filter_map(move |node| match node {
            NodeId::Bean(name) if name.is_in_module(module) => Some(name),
            _ => None,
        })
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.steps.first() else {
            return Ok(());
        };
        for step in &self.steps {
            write!(f, "{}", step.node)?;
            match &step.socket {
                Some(socket) => write!(f, " -[{}]-> ", socket)?,
                None => write!(f, " -> ")?,
            }
        }
        write!(f, "{}", first.node)
    }
}

/// Construction graph of one module.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<NodeId, Vec<Edge>>,
}

impl DependencyGraph {
    pub fn build(
        module: &Module,
        scope: &ModuleScope,
        bindings: &IndexMap<QualifiedName, SocketBinding>,
    ) -> Self {
        let mut graph = Self::default();
        let node_of = |name: &QualifiedName| match scope.candidate(name) {
            Some(candidate) if candidate.is_socket_bean() => NodeId::Boundary(name.clone()),
            _ => NodeId::Bean(name.clone()),
        };

        for candidate in &scope.candidates {
            let from = node_of(&candidate.name);
            graph.add_node(from.clone());
            match &candidate.origin {
                CandidateOrigin::Nested { provider } => {
                    graph.add_edge(from, NodeId::Bean(provider.clone()), None, false);
                }
                CandidateOrigin::Component {
                    module: component,
                    reachable_sockets,
                } => {
                    for socket in reachable_sockets {
                        let to = NodeId::Boundary(QualifiedName::bean(component, socket));
                        graph.add_edge(from.clone(), to, None, false);
                    }
                }
                CandidateOrigin::Local | CandidateOrigin::SocketBean => {}
            }
        }

        for bean in &module.beans {
            if bean.boundary_socket().is_some() {
                let name = QualifiedName::bean(&module.name, &bean.name);
                graph.add_edge(NodeId::Bean(name.clone()), NodeId::Boundary(name), None, false);
            }
        }

        for binding in bindings.values() {
            let from = match &binding.owner {
                SocketOwner::Bean(bean) => NodeId::Bean(bean.clone()),
                SocketOwner::Component { .. } => NodeId::Boundary(binding.socket.clone()),
            };
            for bean in &binding.beans {
                graph.add_edge(
                    from.clone(),
                    node_of(bean),
                    Some(binding.socket.clone()),
                    binding.lazy,
                );
            }
        }

        graph
    }

    fn add_node(&mut self, node: NodeId) {
        self.edges.entry(node).or_default();
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId, via: Option<QualifiedName>, lazy: bool) {
        self.add_node(to.clone());
        self.edges.entry(from).or_default().push(Edge { to, via, lazy });
    }

    fn eager_edges<'a>(&'a self, node: &NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .get(node)
            .into_iter()
            .flatten()
            .filter(|edge| !edge.lazy)
    }

    /// Strongly connected components of the eager subgraph that contain a
    /// cycle, each sorted, in order of their first node.
    pub fn eager_components(&self) -> Vec<Vec<NodeId>> {
        let mut tarjan = Tarjan::default();
        for node in self.edges.keys() {
            if !tarjan.index.contains_key(node) {
                self.strong_connect(node, &mut tarjan);
            }
        }

        let mut components: Vec<Vec<NodeId>> = tarjan
            .components
            .into_iter()
            .filter(|component| match component.as_slice() {
                [single] => self.eager_edges(single).any(|edge| edge.to == *single),
                _ => true,
            })
            .collect();
        components.sort();
        components
    }

    fn strong_connect<'a>(&'a self, node: &'a NodeId, tarjan: &mut Tarjan<'a>) {
        tarjan.index.insert(node, tarjan.next);
        tarjan.low.insert(node, tarjan.next);
        tarjan.next += 1;
        tarjan.stack.push(node);
        tarjan.on_stack.insert(node);

        for edge in self.eager_edges(node) {
            let to = &edge.to;
            if !tarjan.index.contains_key(to) {
                self.strong_connect(to, tarjan);
                let low = tarjan.low[node].min(tarjan.low[to]);
                tarjan.low.insert(node, low);
            } else if tarjan.on_stack.contains(to) {
                let low = tarjan.low[node].min(tarjan.index[to]);
                tarjan.low.insert(node, low);
            }
        }

        if tarjan.low[node] == tarjan.index[node] {
            let mut component = Vec::new();
            while let Some(member) = tarjan.stack.pop() {
                tarjan.on_stack.remove(member);
                component.push(member.clone());
                if member == node {
                    break;
                }
            }
            component.sort();
            tarjan.components.push(component);
        }
    }

    /// Every elementary all-eager cycle.
    ///
    /// Each cycle starts at its smallest node, so rotations are never
    /// reported twice. Enumeration stops after [`MAX_CYCLES_PER_COMPONENT`]
    /// cycles in one component.
    pub fn find_cycles(&self) -> Vec<Cycle> {
        let mut cycles = Vec::new();
        for component in self.eager_components() {
            let members: BTreeSet<NodeId> = component.iter().cloned().collect();
            let mut search = CycleSearch {
                members: &members,
                seen: BTreeSet::new(),
                found: Vec::new(),
            };
            for start in &component {
                let mut path = vec![CycleStep {
                    node: start.clone(),
                    socket: None,
                }];
                self.extend_path(start, start, &mut path, &mut search);
            }
            cycles.extend(search.found);
        }
        cycles
    }

    fn extend_path(
        &self,
        start: &NodeId,
        node: &NodeId,
        path: &mut Vec<CycleStep>,
        search: &mut CycleSearch<'_>,
    ) {
        for edge in self.eager_edges(node) {
            if search.found.len() >= MAX_CYCLES_PER_COMPONENT {
                return;
            }
            if !search.members.contains(&edge.to) || edge.to < *start {
                continue;
            }
            if let Some(last) = path.last_mut() {
                last.socket = edge.via.clone();
            }
            if edge.to == *start {
                let nodes: Vec<NodeId> = path.iter().map(|step| step.node.clone()).collect();
                // Parallel sockets between the same beans form one cycle.
                if search.seen.insert(nodes) {
                    search.found.push(Cycle {
                        steps: path.clone(),
                    });
                }
            } else if !path.iter().any(|step| step.node == edge.to) {
                path.push(CycleStep {
                    node: edge.to.clone(),
                    socket: None,
                });
                self.extend_path(start, &edge.to, path, search);
                path.pop();
            }
        }
    }

    /// Boundary sockets of `module` that the beans bound by `binding` eagerly
    /// depend on, themselves included.
    pub fn binding_reach(
        &self,
        binding: &SocketBinding,
        module: &Identifier,
    ) -> BTreeSet<QualifiedName> {
        let mut reached = BTreeSet::new();
        for bean in &binding.beans {
            // Socket beans only exist as boundary nodes.
            let node = NodeId::Bean(bean.clone());
            let node = if self.edges.contains_key(&node) {
                node
            } else {
                NodeId::Boundary(bean.clone())
            };
            reached.extend(
                self.reachable_boundaries(&node, module)
                    .into_iter()
                    .map(|socket| QualifiedName::bean(module, &socket)),
            );
        }
        reached
    }

    /// Boundary sockets of `module` that `from` eagerly depends on.
    pub fn reachable_boundaries(&self, from: &NodeId, module: &Identifier) -> BTreeSet<Identifier> {
        let mut reached = BTreeSet::new();
        let mut visited = BTreeSet::new();
        let mut stack = vec![from];

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            if let NodeId::Boundary(name) = node {
                if name.len() == 2 && name.is_in_module(module) {
                    reached.insert(name.simple_name().clone());
                }
            }
            stack.extend(self.eager_edges(node).map(|edge| &edge.to));
        }
        reached
    }
}

/// Upper bound on cycles reported for one strongly connected component.
pub const MAX_CYCLES_PER_COMPONENT: usize = 64;

/// Tarjan bookkeeping.
#[derive(Default)]
struct Tarjan<'a> {
    next: usize,
    index: BTreeMap<&'a NodeId, usize>,
    low: BTreeMap<&'a NodeId, usize>,
    stack: Vec<&'a NodeId>,
    on_stack: BTreeSet<&'a NodeId>,
    components: Vec<Vec<NodeId>>,
}

struct CycleSearch<'m> {
    members: &'m BTreeSet<NodeId>,
    seen: BTreeSet<Vec<NodeId>>,
    found: Vec<Cycle>,
}

/// Cycles found in a module and the local beans they make faulty.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycles: Vec<Cycle>,
    pub faulty_beans: BTreeSet<QualifiedName>,
}

/// Report every eager cycle of `graph` as an error attached to `module`.
pub fn check_cycles(
    graph: &DependencyGraph,
    module: &Identifier,
    sink: &mut impl DiagnosticSink,
) -> CycleReport {
    let mut report = CycleReport::default();

    for cycle in graph.find_cycles() {
        let location = cycle
            .local_beans(module)
            .next()
            .cloned()
            .unwrap_or_else(|| QualifiedName::of_module(module));

        let mut diagnostic = Diagnostic::new(
            DiagnosticKind::CyclicDependency,
            location,
            format!("eager dependency cycle: {}", cycle),
        );
        for node in cycle.nodes() {
            diagnostic = diagnostic.with_label(node.name().clone(), "part of the cycle".into());
        }
        sink.report(
            diagnostic.with_note("declare one of the sockets on the cycle lazy".to_string()),
        );

        report.cycles.push(cycle);
    }

    // Every member of a cyclic component lies on some eager cycle, even
    // when enumeration was cut short.
    for component in graph.eager_components() {
        report.faulty_beans.extend(component.into_iter().filter_map(|node| match node {
            NodeId::Bean(name) if name.is_in_module(module) => Some(name),
            _ => None,
        }));
    }

    report
}
