use crate::circuit::{GateId, NodeId};

/// Rejected edits and unreadable persisted circuits.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Gate {0} does not exist")]
    UnknownGate(GateId),
    #[error("Input node {0} does not exist")]
    UnknownInputNode(NodeId),
    #[error("Output node {0} does not exist")]
    UnknownOutputNode(NodeId),
    #[error("Gate {gate} has no input port {port}")]
    NoSuchInputPort { gate: GateId, port: usize },
    #[error("Gate {gate} has no output port {port}")]
    NoSuchOutputPort { gate: GateId, port: usize },
    #[error("Input port {port} of gate {gate} is already driven")]
    FanInViolation { gate: GateId, port: usize },
    #[error("Could not find a free id")]
    IdSpaceExhausted,
    #[error("Circuit name {0:?} must be non-empty and contain only letters, digits, '_' or '-'")]
    InvalidCircuitName(String),
    #[error("A circuit named {0:?} already exists")]
    CircuitNameTaken(String),
    #[error("No circuit named {0:?}")]
    UnknownCircuit(String),
    #[error("Malformed circuit: {0}")]
    Parse(#[from] serde_json::Error),
}
