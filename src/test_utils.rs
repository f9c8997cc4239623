use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::{
    Primitive,
    circuit::{CircuitGraph, CircuitLibrary, GateInstance, InputNode, OutputNode},
};

pub fn trng() -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(0)
}

/// `(a OR b) AND NOT (a AND b)` with inputs `a`, `b` and output `x`.
pub fn xor_graph() -> CircuitGraph {
    let mut rng = trng();
    let mut graph = CircuitGraph::new();

    let a = graph.add_input_node(&mut rng, InputNode::new("a", 0.3)).unwrap();
    let b = graph.add_input_node(&mut rng, InputNode::new("b", 0.7)).unwrap();
    let x = graph.add_output_node(&mut rng, OutputNode::new("x", 0.5)).unwrap();

    let or = graph.add_gate(&mut rng, GateInstance::primitive(Primitive::Or)).unwrap();
    let and = graph.add_gate(&mut rng, GateInstance::primitive(Primitive::And)).unwrap();
    let not = graph.add_gate(&mut rng, GateInstance::primitive(Primitive::Not)).unwrap();
    let out = graph.add_gate(&mut rng, GateInstance::primitive(Primitive::And)).unwrap();

    graph.link_input_node(a, or, 0).unwrap();
    graph.link_input_node(a, and, 0).unwrap();
    graph.link_input_node(b, or, 1).unwrap();
    graph.link_input_node(b, and, 1).unwrap();
    graph.add_link(and, 0, not, 0).unwrap();
    graph.add_link(or, 0, out, 0).unwrap();
    graph.add_link(not, 0, out, 1).unwrap();
    graph.link_output_node(x, out, 0).unwrap();

    graph
}

/// One input node through a NOT gate into one output node.
pub fn inverter_graph() -> CircuitGraph {
    let mut rng = trng();
    let mut graph = CircuitGraph::new();

    let input = graph.add_input_node(&mut rng, InputNode::new("in", 0.5)).unwrap();
    let output = graph.add_output_node(&mut rng, OutputNode::new("out", 0.5)).unwrap();
    let not = graph.add_gate(&mut rng, GateInstance::primitive(Primitive::Not)).unwrap();

    graph.link_input_node(input, not, 0).unwrap();
    graph.link_output_node(output, not, 0).unwrap();
    graph
}

/// A library holding `loop`: an inverter next to an unwired composite gate
/// that runs `loop` itself.
pub fn self_containing_library() -> CircuitLibrary {
    let mut graph = inverter_graph();
    let gate = GateInstance::referencing("loop", &inverter_graph());
    graph
        .add_gate(&mut ChaCha20Rng::seed_from_u64(2), gate.at([0.8, 0.2]))
        .unwrap();

    let mut library = CircuitLibrary::new();
    library.save("loop", graph).unwrap();
    library
}

/// Wraps `inner` in a single composite gate whose ports are wired straight
/// to fresh input and output nodes.
pub fn wrap(inner: CircuitGraph) -> CircuitGraph {
    let gate = GateInstance::embedding("wrapped", inner);
    wrap_gate(gate)
}

pub fn wrap_gate(gate: GateInstance) -> CircuitGraph {
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let mut graph = CircuitGraph::new();
    let (inputs, outputs) = (gate.input_labels.clone(), gate.output_labels.clone());
    let id = graph.add_gate(&mut rng, gate).unwrap();

    for (port, label) in inputs.into_iter().enumerate() {
        let node = graph.add_input_node(&mut rng, InputNode::new(label, 0.5)).unwrap();
        graph.link_input_node(node, id, port).unwrap();
    }
    for (port, label) in outputs.into_iter().enumerate() {
        let node = graph.add_output_node(&mut rng, OutputNode::new(label, 0.5)).unwrap();
        graph.link_output_node(node, id, port).unwrap();
    }
    graph
}
