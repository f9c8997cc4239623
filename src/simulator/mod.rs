use crate::{
    Error,
    circuit::{CircuitGraph, CircuitLibrary},
    compiler::CompiledCircuit,
};

mod propagate;
mod scheduled;

pub use propagate::{GateState, Propagate, PropagationState};
pub use scheduled::Scheduled;

/// How a workspace advances its circuit by one simulation tick.
///
/// A mode is prepared once per successful compilation and then stepped every
/// tick until the next structural edit. Stepping reads input node states and
/// writes output node states; it changes nothing else in the graph.
pub trait SimulationMode {
    /// Takes a freshly compiled form of `graph`.
    fn prepare(
        &mut self,
        compiled: CompiledCircuit,
        graph: &CircuitGraph,
        library: &CircuitLibrary,
    ) -> Result<(), Error>;

    /// Drops whatever `prepare` built.
    fn clear(&mut self);

    fn step(&mut self, graph: &mut CircuitGraph) -> Result<(), Error>;
}
