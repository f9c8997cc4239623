//! Turns a [`CircuitGraph`] into a [`CompiledCircuit`]: every reachable gate
//! gets output slots in one shared [`SignalStore`], every input port is bound
//! to the slot that drives it, and each circuit level is put in evaluation
//! order.

use std::fmt;

use indexmap::IndexMap;
use log::{debug, trace, warn};

use crate::{
    Slot,
    circuit::{CircuitGraph, CircuitLibrary, GateId, GateInstance, NodeId, Representation},
    config::SimulatorConfig,
    storage::{SignalStore, StoreError},
};

mod circuit_key;
mod compiled;
mod schedule;

pub use circuit_key::CircuitKey;
pub use compiled::{CompiledCircuit, CompiledGate, CompiledGraph, Operation};
pub use schedule::{Schedule, topological_order};

/// Something a driver can be bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sink {
    GatePort { gate: GateId, port: usize },
    OutputNode(NodeId),
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::GatePort { gate, port } => write!(f, "input {port} of gate {gate}"),
            Sink::OutputNode(node) => write!(f, "output node {node}"),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Circuit does not fit: {0}")]
    Store(#[from] StoreError),
    /// `port` is `None` when the gate itself does not exist.
    #[error("Link to gate {gate} (port {port:?}) does not resolve")]
    DanglingLink { gate: GateId, port: Option<usize> },
    #[error("More than one driver for {0}")]
    MultipleDrivers(Sink),
    #[error("Circuit {name} contains itself")]
    RecursiveSelfReference { name: String },
    #[error("Composite gates nest deeper than {limit} levels")]
    NestingTooDeep { limit: usize },
    #[error("Unknown library circuit {0:?}")]
    UnknownCircuit(String),
    #[error("Composite gate {0} has no representation")]
    MissingRepresentation(GateId),
    #[error(
        "Composite gate {gate} declares {declared:?} ports but its circuit has {actual:?} nodes"
    )]
    ArityMismatch {
        gate: GateId,
        declared: (usize, usize),
        actual: (usize, usize),
    },
}
pub type CompileError = Error;

impl Error {
    pub fn is_out_of_capacity(&self) -> bool {
        matches!(self, Error::Store(StoreError::OutOfCapacity { .. }))
    }
}

/// Compiles an unnamed top-level circuit.
pub fn compile(
    graph: &CircuitGraph,
    library: &CircuitLibrary,
    config: &SimulatorConfig,
) -> Result<CompiledCircuit, Error> {
    Compiler::new(library, config).finish(CircuitKey::structural(graph), "<workspace>", graph)
}

/// Compiles a top-level circuit saved under `name`, so that references back
/// to `name` from inside it are caught as self-containment.
pub fn compile_named(
    name: &str,
    graph: &CircuitGraph,
    library: &CircuitLibrary,
    config: &SimulatorConfig,
) -> Result<CompiledCircuit, Error> {
    Compiler::new(library, config).finish(CircuitKey::named(name), name, graph)
}

struct Compiler<'l> {
    library: &'l CircuitLibrary,
    max_depth: usize,
    store: SignalStore,
    /// Circuits currently being compiled, outermost first.
    ancestors: Vec<CircuitKey>,
}

impl<'l> Compiler<'l> {
    fn new(library: &'l CircuitLibrary, config: &SimulatorConfig) -> Self {
        Self {
            library,
            max_depth: config.max_nesting_depth,
            store: SignalStore::new(config.signal_capacity),
            ancestors: Vec::new(),
        }
    }

    fn finish(
        mut self,
        key: CircuitKey,
        name: &str,
        graph: &CircuitGraph,
    ) -> Result<CompiledCircuit, Error> {
        let root = self.compile_level(key, name, graph)?;
        debug!(
            "compiled {name} [{key}]: {} gates, {} of {} slots",
            root.gate_count(),
            self.store.len(),
            self.store.capacity()
        );
        Ok(CompiledCircuit {
            store: self.store,
            root,
        })
    }

    fn compile_level(
        &mut self,
        key: CircuitKey,
        name: &str,
        graph: &CircuitGraph,
    ) -> Result<CompiledGraph, Error> {
        self.enter(key, name)?;
        let result = LevelWalk::new(self, graph).run(key);
        self.ancestors.pop();
        result
    }

    /// Pushes `key` onto the ancestor stack unless that would close a loop
    /// or exceed the nesting limit.
    fn enter(&mut self, key: CircuitKey, name: &str) -> Result<(), Error> {
        if self.ancestors.contains(&key) {
            return Err(Error::RecursiveSelfReference {
                name: name.to_string(),
            });
        }
        // the top level is not a nesting level
        if self.ancestors.len() > self.max_depth {
            return Err(Error::NestingTooDeep {
                limit: self.max_depth,
            });
        }

        trace!("entering {name} [{key}] at depth {}", self.ancestors.len());
        self.ancestors.push(key);
        Ok(())
    }

    /// Resolves and compiles the circuit behind a composite gate.
    fn compile_composite(&mut self, id: GateId, gate: &GateInstance) -> Result<CompiledGraph, Error> {
        let (key, name, nested) = resolve_composite(self.library, id, gate)?;
        self.compile_level(key, name, nested)
    }

    /// Checks a composite that the walk never reached. Nothing is allocated,
    /// but the circuit behind it must still resolve and must not contain
    /// itself at any depth.
    fn check_composite(&mut self, id: GateId, gate: &GateInstance) -> Result<(), Error> {
        let (key, name, nested) = resolve_composite(self.library, id, gate)?;
        self.enter(key, name)?;
        let result = nested
            .gates
            .iter()
            .filter(|(_, gate)| gate.kind.is_composite())
            .try_for_each(|(id, gate)| self.check_composite(*id, gate));
        self.ancestors.pop();
        result
    }
}

/// The key, display name and graph a composite gate runs, once its declared
/// ports are known to match that graph.
fn resolve_composite<'a>(
    library: &'a CircuitLibrary,
    id: GateId,
    gate: &'a GateInstance,
) -> Result<(CircuitKey, &'a str, &'a CircuitGraph), Error> {
    let (key, name, nested) = match &gate.representation {
        None => return Err(Error::MissingRepresentation(id)),
        Some(Representation::Library(name)) => {
            let nested = library
                .get(name)
                .map_err(|_| Error::UnknownCircuit(name.clone()))?;
            (CircuitKey::named(name), name.as_str(), nested)
        }
        Some(Representation::Embedded(nested)) => (
            CircuitKey::structural(nested),
            gate.name.as_str(),
            nested.as_ref(),
        ),
    };

    let declared = (gate.input_labels.len(), gate.output_labels.len());
    let actual = (nested.input_nodes.len(), nested.output_nodes.len());
    if declared != actual {
        return Err(Error::ArityMismatch {
            gate: id,
            declared,
            actual,
        });
    }
    Ok((key, name, nested))
}

/// A gate found during the walk; input ports fill in as links are followed.
struct Pending {
    inputs: Vec<Option<Slot>>,
    outputs: Vec<Slot>,
    operation: Operation,
}

/// Discovery and binding for a single circuit level.
struct LevelWalk<'c, 'l, 'g> {
    compiler: &'c mut Compiler<'l>,
    graph: &'g CircuitGraph,
    discovered: IndexMap<GateId, Pending>,
    /// Discovered gates whose outbound links are not followed yet.
    frontier: Vec<GateId>,
}

impl<'c, 'l, 'g> LevelWalk<'c, 'l, 'g> {
    fn new(compiler: &'c mut Compiler<'l>, graph: &'g CircuitGraph) -> Self {
        Self {
            compiler,
            graph,
            discovered: IndexMap::new(),
            frontier: Vec::new(),
        }
    }

    fn run(mut self, key: CircuitKey) -> Result<CompiledGraph, Error> {
        let graph = self.graph;

        let mut input_slots = Vec::with_capacity(graph.input_nodes.len());
        for node in graph.input_nodes.values() {
            let slot = self.compiler.store.allocate()?;
            for link in &node.links {
                self.bind(link.target, link.target_port, slot)?;
            }
            input_slots.push(slot);
            self.follow_frontier()?;
        }

        let mut output_slots = Vec::with_capacity(graph.output_nodes.len());
        for (id, node) in &graph.output_nodes {
            let slot = match node.links.as_slice() {
                [] => Slot::UNCONNECTED,
                [link] => {
                    self.discover(link.source)?;
                    self.follow_frontier()?;
                    self.discovered[&link.source]
                        .outputs
                        .get(link.source_port)
                        .copied()
                        .ok_or(Error::DanglingLink {
                            gate: link.source,
                            port: Some(link.source_port),
                        })?
                }
                _ => return Err(Error::MultipleDrivers(Sink::OutputNode(*id))),
            };
            output_slots.push(slot);
        }

        for (id, gate) in &graph.gates {
            if gate.kind.is_composite() && !self.discovered.contains_key(id) {
                self.compiler.check_composite(*id, gate)?;
            }
        }

        let Schedule { order, feedback } = topological_order(&self.successors());
        if !feedback.is_empty() {
            warn!(
                "circuit [{key}] has {} gates on feedback loops; they read last tick's values",
                feedback.len()
            );
        }

        let mut pending: Vec<Option<(GateId, Pending)>> =
            self.discovered.into_iter().map(Some).collect();
        let gates = order
            .into_iter()
            .filter_map(|index| pending[index].take())
            .map(|(id, gate)| CompiledGate {
                id,
                inputs: gate
                    .inputs
                    .into_iter()
                    .map(|slot| slot.unwrap_or(Slot::UNCONNECTED))
                    .collect(),
                outputs: gate.outputs,
                operation: gate.operation,
            })
            .collect();

        Ok(CompiledGraph {
            key,
            input_slots,
            output_slots,
            gates,
            feedback_gates: feedback.len(),
        })
    }

    /// Allocates output slots for `id` the first time it is reached.
    fn discover(&mut self, id: GateId) -> Result<(), Error> {
        if self.discovered.contains_key(&id) {
            return Ok(());
        }
        let graph = self.graph;
        let gate = graph
            .gates
            .get(&id)
            .ok_or(Error::DanglingLink { gate: id, port: None })?;

        let pending = match gate.kind.primitive() {
            Some(primitive) => {
                let outputs = (0..primitive.output_arity())
                    .map(|_| self.compiler.store.allocate())
                    .collect::<Result<Vec<_>, _>>()?;
                Pending {
                    inputs: vec![None; primitive.input_arity()],
                    outputs,
                    operation: Operation::Primitive(primitive),
                }
            }
            None => {
                let nested = self.compiler.compile_composite(id, gate)?;
                Pending {
                    inputs: vec![None; nested.input_slots.len()],
                    outputs: nested.output_slots.clone(),
                    operation: Operation::Composite(Box::new(nested)),
                }
            }
        };

        trace!("discovered gate {id} ({}) -> {:?}", gate.name, pending.outputs);
        self.discovered.insert(id, pending);
        self.frontier.push(id);
        Ok(())
    }

    fn bind(&mut self, target: GateId, port: usize, slot: Slot) -> Result<(), Error> {
        self.discover(target)?;
        let pending = self
            .discovered
            .get_mut(&target)
            .ok_or(Error::DanglingLink {
                gate: target,
                port: None,
            })?;
        let cell = pending.inputs.get_mut(port).ok_or(Error::DanglingLink {
            gate: target,
            port: Some(port),
        })?;
        if cell.is_some() {
            return Err(Error::MultipleDrivers(Sink::GatePort { gate: target, port }));
        }
        *cell = Some(slot);
        trace!("bound input {port} of gate {target} to slot {slot}");
        Ok(())
    }

    /// Follows the outbound links of every gate discovered but not yet
    /// expanded. Each gate is expanded once, which is what makes loops
    /// terminate.
    fn follow_frontier(&mut self) -> Result<(), Error> {
        let graph = self.graph;
        while let Some(id) = self.frontier.pop() {
            let Some(gate) = graph.gates.get(&id) else {
                continue;
            };
            let outputs = self.discovered[&id].outputs.clone();
            for link in &gate.links {
                let slot = outputs
                    .get(link.source_port)
                    .copied()
                    .ok_or(Error::DanglingLink {
                        gate: id,
                        port: Some(link.source_port),
                    })?;
                self.bind(link.target, link.target_port, slot)?;
            }
        }
        Ok(())
    }

    /// Consumers of each discovered gate, by discovery index.
    fn successors(&self) -> Vec<Vec<usize>> {
        self.discovered
            .keys()
            .map(|id| {
                self.graph.gates[id]
                    .links
                    .iter()
                    .filter_map(|link| self.discovered.get_index_of(&link.target))
                    .collect()
            })
            .collect()
    }
}
