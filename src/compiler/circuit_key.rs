use std::fmt;

use crate::circuit::{CircuitGraph, Representation};

/// 16-byte fingerprint identifying a circuit while it is being compiled.
///
/// Library circuits are keyed by name, so a circuit that reaches itself
/// through any chain of library references produces a key already on the
/// compile stack. Embedded circuits are keyed by their structure.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CircuitKey([u8; 16]);

impl CircuitKey {
    pub fn named(name: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"library|");
        hasher.update(name.as_bytes());
        Self::finish(hasher)
    }

    pub fn structural(graph: &CircuitGraph) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"embedded|");
        hash_graph(&mut hasher, graph);
        Self::finish(hasher)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    fn finish(hasher: blake3::Hasher) -> Self {
        let hash = hasher.finalize();
        let mut key = [0u8; 16];
        key.copy_from_slice(&hash.as_bytes()[..16]);
        Self(key)
    }
}

impl fmt::Display for CircuitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0[..4].iter().try_for_each(|byte| write!(f, "{byte:02x}"))
    }
}

impl fmt::Debug for CircuitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CircuitKey({self})")
    }
}

/// Feeds everything that affects simulation into `hasher`. Names, colours and
/// positions are left out.
fn hash_graph(hasher: &mut blake3::Hasher, graph: &CircuitGraph) {
    let mut put = |value: u64| {
        hasher.update(&value.to_le_bytes());
    };

    put(graph.gates.len() as u64);
    for (id, gate) in &graph.gates {
        put(id.0);
        put(u8::from(gate.kind) as u64);
        put(gate.input_labels.len() as u64);
        put(gate.output_labels.len() as u64);
        put(gate.links.len() as u64);
        for link in &gate.links {
            put(link.target.0);
            put(link.source_port as u64);
            put(link.target_port as u64);
        }
    }

    put(graph.input_nodes.len() as u64);
    for (id, node) in &graph.input_nodes {
        put(id.0);
        put(node.links.len() as u64);
        for link in &node.links {
            put(link.target.0);
            put(link.target_port as u64);
        }
    }

    put(graph.output_nodes.len() as u64);
    for (id, node) in &graph.output_nodes {
        put(id.0);
        put(node.links.len() as u64);
        for link in &node.links {
            put(link.source.0);
            put(link.source_port as u64);
        }
    }

    for gate in graph.gates.values() {
        match &gate.representation {
            None => {
                hasher.update(b"|none");
            }
            Some(Representation::Library(name)) => {
                hasher.update(b"|library=");
                hasher.update(name.as_bytes());
            }
            Some(Representation::Embedded(inner)) => {
                hasher.update(b"|embedded=");
                hash_graph(hasher, inner);
            }
        }
    }
}
