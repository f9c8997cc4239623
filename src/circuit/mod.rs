mod edit;
mod errors;
mod graph;
mod ids;
mod library;

pub use errors::GraphError;
pub use graph::{
    CircuitGraph, DEFAULT_COLOR, DEFAULT_POSITION, Driver, GateInstance, GateLink, InputLink,
    InputNode, MalformedLink, OutputLink, OutputNode, Representation,
};
pub use ids::{GateId, MAX_ID, MAX_ID_ATTEMPTS, NodeId};
pub use library::{CircuitLibrary, is_valid_name};
