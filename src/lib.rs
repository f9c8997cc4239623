pub mod circuit;
pub mod compiler;
pub mod config;
mod core;
mod error;
pub mod simulator;
pub mod storage;
mod workspace;

pub use self::core::{
    gate_type::{GateKind, Primitive, UnknownGateKind},
    slot::Slot,
};

pub use circuit::{
    CircuitGraph, CircuitLibrary, GateId, GateInstance, GraphError, InputNode, NodeId, OutputNode,
    Representation,
};
pub use compiler::{CompileError, CompiledCircuit, compile, compile_named};
pub use config::{ConfigError, SimulatorConfig};
pub use error::Error;
pub use simulator::{Propagate, Scheduled, SimulationMode};
pub use storage::{SignalStore, StoreError};
pub use workspace::Workspace;

#[cfg(test)]
pub mod test_utils;
