use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    GateKind, Primitive,
    circuit::{GateId, GraphError, NodeId},
};

pub const DEFAULT_COLOR: &str = "#808080";
pub const DEFAULT_POSITION: [f64; 2] = [0.5, 0.5];

/// A user-built circuit: gates, boundary nodes and the links between them.
///
/// All three maps keep insertion order. For a circuit used inside a composite
/// gate, the order of `input_nodes`/`output_nodes` is the order of the
/// composite's ports.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitGraph {
    #[serde(rename = "circuits", default)]
    pub gates: IndexMap<GateId, GateInstance>,
    #[serde(rename = "inputNodes", default)]
    pub input_nodes: IndexMap<NodeId, InputNode>,
    #[serde(rename = "outputNodes", default)]
    pub output_nodes: IndexMap<NodeId, OutputNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateInstance {
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_position")]
    pub position: [f64; 2],
    #[serde(default)]
    pub input_labels: Vec<String>,
    #[serde(default)]
    pub output_labels: Vec<String>,
    #[serde(default)]
    pub links: Vec<GateLink>,
    #[serde(rename = "type")]
    pub kind: GateKind,
    #[serde(default)]
    pub representation: Option<Representation>,
}

/// What a composite gate runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Representation {
    /// Name of a circuit in the [`CircuitLibrary`](crate::CircuitLibrary).
    Library(String),
    /// A private copy of the circuit carried inside the gate.
    Embedded(Box<CircuitGraph>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputNode {
    #[serde(default)]
    pub state: bool,
    #[serde(default)]
    pub position: f64,
    #[serde(default)]
    pub links: Vec<InputLink>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputNode {
    #[serde(default)]
    pub state: bool,
    #[serde(default)]
    pub position: f64,
    /// Holds at most one link; the edit operations keep it that way.
    #[serde(default)]
    pub links: Vec<OutputLink>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// Connection from an output port of the owning gate to an input port of `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLink", into = "RawLink")]
pub struct GateLink {
    pub target: GateId,
    pub target_port: usize,
    pub source_port: usize,
}

/// Connection from an input node to an input port of `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLink", into = "RawLink")]
pub struct InputLink {
    pub target: GateId,
    pub target_port: usize,
}

/// Connection from an output port of `source` to an output node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLink", into = "RawLink")]
pub struct OutputLink {
    pub source: GateId,
    pub source_port: usize,
}

/// On-disk shape shared by all three link kinds. `input` names an output port
/// of the producing gate, `output` an input port of the consuming gate.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct RawLink {
    circuit: GateId,
    #[serde(default)]
    input: Option<usize>,
    #[serde(default)]
    output: Option<usize>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Link to gate {circuit} is missing its {field:?} port")]
pub struct MalformedLink {
    circuit: GateId,
    field: &'static str,
}

impl TryFrom<RawLink> for GateLink {
    type Error = MalformedLink;

    fn try_from(raw: RawLink) -> Result<Self, Self::Error> {
        Ok(Self {
            target: raw.circuit,
            source_port: raw.input.ok_or(raw.missing("input"))?,
            target_port: raw.output.ok_or(raw.missing("output"))?,
        })
    }
}

impl From<GateLink> for RawLink {
    fn from(link: GateLink) -> Self {
        RawLink {
            circuit: link.target,
            input: Some(link.source_port),
            output: Some(link.target_port),
        }
    }
}

impl TryFrom<RawLink> for InputLink {
    type Error = MalformedLink;

    fn try_from(raw: RawLink) -> Result<Self, Self::Error> {
        Ok(Self {
            target: raw.circuit,
            target_port: raw.output.ok_or(raw.missing("output"))?,
        })
    }
}

impl From<InputLink> for RawLink {
    fn from(link: InputLink) -> Self {
        RawLink {
            circuit: link.target,
            input: None,
            output: Some(link.target_port),
        }
    }
}

impl TryFrom<RawLink> for OutputLink {
    type Error = MalformedLink;

    fn try_from(raw: RawLink) -> Result<Self, Self::Error> {
        Ok(Self {
            source: raw.circuit,
            source_port: raw.input.ok_or(raw.missing("input"))?,
        })
    }
}

impl From<OutputLink> for RawLink {
    fn from(link: OutputLink) -> Self {
        RawLink {
            circuit: link.source,
            input: Some(link.source_port),
            output: None,
        }
    }
}

impl RawLink {
    fn missing(&self, field: &'static str) -> MalformedLink {
        MalformedLink {
            circuit: self.circuit,
            field,
        }
    }
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_position() -> [f64; 2] {
    DEFAULT_POSITION
}

/// Whatever currently feeds a gate input port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Driver {
    Gate { gate: GateId, port: usize },
    InputNode(NodeId),
}

impl GateInstance {
    /// A palette gate with its default name and labels.
    pub fn primitive(primitive: Primitive) -> Self {
        let (input_labels, output_labels) = primitive.default_labels();
        Self {
            name: primitive.name().to_string(),
            color: default_color(),
            position: DEFAULT_POSITION,
            input_labels,
            output_labels,
            links: Vec::new(),
            kind: primitive.kind(),
            representation: None,
        }
    }

    /// A composite gate carrying its own copy of `circuit`. Port labels are
    /// taken from the circuit's node names.
    pub fn embedding(name: impl Into<String>, circuit: CircuitGraph) -> Self {
        let (input_labels, output_labels) = circuit.port_labels();
        Self::composite(
            name,
            input_labels,
            output_labels,
            Representation::Embedded(Box::new(circuit)),
        )
    }

    /// A composite gate that runs the library circuit `name`, as it is at
    /// compile time.
    pub fn referencing(name: impl Into<String>, circuit: &CircuitGraph) -> Self {
        let name = name.into();
        let (input_labels, output_labels) = circuit.port_labels();
        Self::composite(
            name.clone(),
            input_labels,
            output_labels,
            Representation::Library(name),
        )
    }

    pub fn composite(
        name: impl Into<String>,
        input_labels: Vec<String>,
        output_labels: Vec<String>,
        representation: Representation,
    ) -> Self {
        Self {
            name: name.into(),
            color: default_color(),
            position: DEFAULT_POSITION,
            input_labels,
            output_labels,
            links: Vec::new(),
            kind: GateKind::Composite,
            representation: Some(representation),
        }
    }

    pub fn at(mut self, position: [f64; 2]) -> Self {
        self.position = position;
        self
    }

    /// Number of input ports. Primitives have a fixed arity regardless of labels.
    pub fn input_arity(&self) -> usize {
        match self.kind.primitive() {
            Some(primitive) => primitive.input_arity(),
            None => self.input_labels.len(),
        }
    }

    pub fn output_arity(&self) -> usize {
        match self.kind.primitive() {
            Some(primitive) => primitive.output_arity(),
            None => self.output_labels.len(),
        }
    }
}

impl InputNode {
    pub fn new(name: impl Into<String>, position: f64) -> Self {
        Self {
            state: false,
            position,
            links: Vec::new(),
            name: name.into(),
        }
    }
}

impl OutputNode {
    pub fn new(name: impl Into<String>, position: f64) -> Self {
        Self {
            state: false,
            position,
            links: Vec::new(),
            name: name.into(),
        }
    }

    /// The single link, if the node is linked at all.
    pub fn link(&self) -> Option<&OutputLink> {
        self.links.first()
    }
}

impl CircuitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn gate(&self, id: GateId) -> Result<&GateInstance, GraphError> {
        self.gates.get(&id).ok_or(GraphError::UnknownGate(id))
    }

    pub fn input_node(&self, id: NodeId) -> Result<&InputNode, GraphError> {
        self.input_nodes
            .get(&id)
            .ok_or(GraphError::UnknownInputNode(id))
    }

    pub fn output_node(&self, id: NodeId) -> Result<&OutputNode, GraphError> {
        self.output_nodes
            .get(&id)
            .ok_or(GraphError::UnknownOutputNode(id))
    }

    /// Input node states in port order.
    pub fn input_states(&self) -> Vec<bool> {
        self.input_nodes.values().map(|node| node.state).collect()
    }

    /// Output node states in port order.
    pub fn output_states(&self) -> Vec<bool> {
        self.output_nodes.values().map(|node| node.state).collect()
    }

    /// Assigns input node states in port order. Extra values are ignored.
    pub fn set_input_states(&mut self, states: &[bool]) {
        self.input_nodes
            .values_mut()
            .zip(states)
            .for_each(|(node, state)| node.state = *state);
    }

    pub(crate) fn set_output_states(&mut self, states: &[bool]) {
        self.output_nodes
            .values_mut()
            .zip(states)
            .for_each(|(node, state)| node.state = *state);
    }

    /// Labels a composite gate wrapping this circuit exposes.
    pub fn port_labels(&self) -> (Vec<String>, Vec<String>) {
        (
            self.input_nodes.values().map(|n| n.name.clone()).collect(),
            self.output_nodes.values().map(|n| n.name.clone()).collect(),
        )
    }

    /// Finds what feeds input `port` of `gate`, searching gates first and then
    /// input nodes.
    pub fn driver_of(&self, gate: GateId, port: usize) -> Option<Driver> {
        let from_gate = self.gates.iter().find_map(|(source, instance)| {
            instance
                .links
                .iter()
                .find(|link| link.target == gate && link.target_port == port)
                .map(|link| Driver::Gate {
                    gate: *source,
                    port: link.source_port,
                })
        });

        from_gate.or_else(|| {
            self.input_nodes.iter().find_map(|(node, input)| {
                input
                    .links
                    .iter()
                    .any(|link| link.target == gate && link.target_port == port)
                    .then_some(Driver::InputNode(*node))
            })
        })
    }
}
