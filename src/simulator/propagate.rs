//! Single-pass signal propagation over the graph itself.
//!
//! Every gate keeps the values last seen on its ports. A tick pushes the
//! input node states into the gates they drive and walks links breadth
//! first, evaluating each gate at most once. A gate reached before all of its
//! producers have fired uses their previous values, so a change takes one
//! tick per level of logic to reach the outputs.

use std::collections::VecDeque;

use log::trace;

use crate::{
    Error,
    circuit::{CircuitGraph, CircuitLibrary, GateInstance, Representation},
    compiler::{CircuitKey, CompileError, CompiledCircuit},
    simulator::SimulationMode,
};

/// Port values of one gate, and the nested circuit if it is a composite.
#[derive(Clone, Debug, PartialEq)]
pub struct GateState {
    pub input_values: Vec<bool>,
    pub output_values: Vec<bool>,
    nested: Option<Box<NestedCircuit>>,
}

#[derive(Clone, Debug, PartialEq)]
struct NestedCircuit {
    graph: CircuitGraph,
    state: PropagationState,
}

/// Per-gate state of one circuit level, aligned with the order of
/// [`CircuitGraph::gates`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropagationState {
    gates: Vec<GateState>,
}

impl GateState {
    fn new(
        gate: &GateInstance,
        library: &CircuitLibrary,
        ancestors: &mut Vec<CircuitKey>,
    ) -> Result<Self, Error> {
        let nested = match &gate.representation {
            Some(representation) if gate.kind.is_composite() => {
                let (key, name) = match representation {
                    Representation::Library(name) => (CircuitKey::named(name), name.as_str()),
                    Representation::Embedded(graph) => {
                        (CircuitKey::structural(graph), gate.name.as_str())
                    }
                };
                if ancestors.contains(&key) {
                    return Err(CompileError::RecursiveSelfReference {
                        name: name.to_string(),
                    }
                    .into());
                }

                let graph = library.resolve(representation)?.clone();
                ancestors.push(key);
                let state = PropagationState::build(&graph, library, ancestors);
                ancestors.pop();
                Some(Box::new(NestedCircuit {
                    graph,
                    state: state?,
                }))
            }
            _ => None,
        };

        Ok(Self {
            input_values: vec![false; gate.input_arity()],
            output_values: vec![false; gate.output_arity()],
            nested,
        })
    }

    fn evaluate(&mut self, gate: &GateInstance) -> Result<(), Error> {
        match (gate.kind.primitive(), self.nested.as_deref_mut()) {
            (Some(primitive), _) => {
                let a = self.input_values.first().copied().unwrap_or(false);
                let b = self.input_values.get(1).copied().unwrap_or(false);
                if let Some(out) = self.output_values.first_mut() {
                    *out = primitive.evaluate(a, b);
                }
            }
            (None, Some(nested)) => {
                nested.graph.set_input_states(&self.input_values);
                nested.state.step(&mut nested.graph)?;
                self.output_values
                    .iter_mut()
                    .zip(nested.graph.output_states())
                    .for_each(|(out, value)| *out = value);
            }
            (None, None) => {}
        }
        Ok(())
    }
}

impl PropagationState {
    /// Builds state for `graph` and every circuit nested in it. A circuit
    /// that contains itself is rejected with
    /// [`RecursiveSelfReference`](CompileError::RecursiveSelfReference).
    pub fn new(graph: &CircuitGraph, library: &CircuitLibrary) -> Result<Self, Error> {
        Self::build(graph, library, &mut vec![CircuitKey::structural(graph)])
    }

    fn build(
        graph: &CircuitGraph,
        library: &CircuitLibrary,
        ancestors: &mut Vec<CircuitKey>,
    ) -> Result<Self, Error> {
        let gates = graph
            .gates
            .values()
            .map(|gate| GateState::new(gate, library, ancestors))
            .collect::<Result<_, _>>()?;
        Ok(Self { gates })
    }

    pub fn gate(&self, index: usize) -> Option<&GateState> {
        self.gates.get(index)
    }

    /// One propagation pass over `graph`, which must be the graph this state
    /// was built from.
    pub fn step(&mut self, graph: &mut CircuitGraph) -> Result<(), Error> {
        let mut queue = VecDeque::new();
        let mut queued = vec![false; self.gates.len()];

        for node in graph.input_nodes.values() {
            for link in &node.links {
                let Some(index) = graph.gates.get_index_of(&link.target) else {
                    continue;
                };
                if let Some(value) = self.gates[index].input_values.get_mut(link.target_port) {
                    *value = node.state;
                }
                if !queued[index] {
                    queued[index] = true;
                    queue.push_back(index);
                }
            }
        }

        while let Some(index) = queue.pop_front() {
            let Some((id, gate)) = graph.gates.get_index(index) else {
                continue;
            };
            self.gates[index].evaluate(gate)?;
            trace!("gate {id} -> {:?}", self.gates[index].output_values);

            for link in &gate.links {
                let Some(target) = graph.gates.get_index_of(&link.target) else {
                    continue;
                };
                let value = self.gates[index]
                    .output_values
                    .get(link.source_port)
                    .copied()
                    .unwrap_or(false);
                if let Some(input) = self.gates[target].input_values.get_mut(link.target_port) {
                    *input = value;
                }
                if !queued[target] {
                    queued[target] = true;
                    queue.push_back(target);
                }
            }
        }

        let outputs: Vec<bool> = graph
            .output_nodes
            .values()
            .map(|node| {
                node.link()
                    .and_then(|link| {
                        let index = graph.gates.get_index_of(&link.source)?;
                        self.gates[index].output_values.get(link.source_port).copied()
                    })
                    .unwrap_or(false)
            })
            .collect();
        graph.set_output_states(&outputs);
        Ok(())
    }
}

/// Steps a [`PropagationState`] once per tick.
///
/// The compiled form handed to [`prepare`](SimulationMode::prepare) is only
/// used as proof that the graph is well formed; nested circuits are expanded
/// from the graph and library instead.
#[derive(Debug, Default)]
pub struct Propagate {
    state: Option<PropagationState>,
}

impl Propagate {
    pub fn state(&self) -> Option<&PropagationState> {
        self.state.as_ref()
    }
}

impl SimulationMode for Propagate {
    fn prepare(
        &mut self,
        _compiled: CompiledCircuit,
        graph: &CircuitGraph,
        library: &CircuitLibrary,
    ) -> Result<(), Error> {
        self.state = Some(PropagationState::new(graph, library)?);
        Ok(())
    }

    fn clear(&mut self) {
        self.state = None;
    }

    fn step(&mut self, graph: &mut CircuitGraph) -> Result<(), Error> {
        match self.state.as_mut() {
            Some(state) => state.step(graph),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::{
        Primitive,
        circuit::{InputNode, OutputNode},
        test_utils::{inverter_graph, self_containing_library, trng, wrap, xor_graph},
    };

    fn state(graph: &CircuitGraph) -> PropagationState {
        PropagationState::new(graph, &CircuitLibrary::new()).unwrap()
    }

    #[test]
    fn inverter_follows_input_each_tick() {
        let mut graph = inverter_graph();
        let mut state = state(&graph);

        state.step(&mut graph).unwrap();
        assert_eq!(graph.output_states(), [true]);

        graph.set_input_states(&[true]);
        state.step(&mut graph).unwrap();
        assert_eq!(graph.output_states(), [false]);
    }

    #[test]
    fn xor_settles_after_its_depth() {
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let mut graph = xor_graph();
            let mut state = state(&graph);
            graph.set_input_states(&[a, b]);
            for _ in 0..3 {
                state.step(&mut graph).unwrap();
            }
            assert_eq!(graph.output_states(), [a ^ b], "xor({a}, {b})");
        }
    }

    #[test]
    fn late_producer_is_seen_next_tick() {
        // the final AND is dequeued before the NOT that feeds it
        let mut graph = xor_graph();
        let mut state = state(&graph);

        graph.set_input_states(&[true, false]);
        state.step(&mut graph).unwrap();
        assert_eq!(graph.output_states(), [false]);

        state.step(&mut graph).unwrap();
        assert_eq!(graph.output_states(), [true]);
    }

    #[test]
    fn composite_runs_nested_state() {
        let mut graph = wrap(inverter_graph());
        let mut state = state(&graph);

        state.step(&mut graph).unwrap();
        assert_eq!(graph.output_states(), [true]);
        assert_eq!(state.gate(0).unwrap().output_values, [true]);

        graph.set_input_states(&[true]);
        state.step(&mut graph).unwrap();
        assert_eq!(graph.output_states(), [false]);
    }

    #[test]
    fn gates_not_reached_from_inputs_keep_their_values() {
        let mut rng = trng();
        let mut graph = CircuitGraph::new();
        let not = graph
            .add_gate(&mut rng, GateInstance::primitive(Primitive::Not))
            .unwrap();
        let out = graph
            .add_output_node(&mut rng, OutputNode::new("q", 0.5))
            .unwrap();
        graph.link_output_node(out, not, 0).unwrap();
        graph
            .add_input_node(&mut rng, InputNode::new("unused", 0.5))
            .unwrap();

        let mut state = state(&graph);
        state.step(&mut graph).unwrap();
        assert_eq!(graph.output_states(), [false]);
    }

    #[test]
    fn self_containing_circuit_is_rejected() {
        let library = self_containing_library();
        let err = PropagationState::new(library.get("loop").unwrap(), &library).unwrap_err();
        assert!(matches!(
            err,
            Error::Compile(CompileError::RecursiveSelfReference { ref name }) if name == "loop"
        ));
    }
}
