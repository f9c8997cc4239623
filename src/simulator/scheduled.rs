use log::{trace, warn};

use crate::{
    Error,
    circuit::{CircuitGraph, CircuitLibrary},
    compiler::CompiledCircuit,
    simulator::SimulationMode,
};

/// Runs the compiled schedule once per tick. Acyclic circuits settle within
/// the tick their inputs change.
#[derive(Debug, Default)]
pub struct Scheduled {
    compiled: Option<CompiledCircuit>,
}

impl Scheduled {
    pub fn compiled(&self) -> Option<&CompiledCircuit> {
        self.compiled.as_ref()
    }
}

impl SimulationMode for Scheduled {
    fn prepare(
        &mut self,
        compiled: CompiledCircuit,
        _graph: &CircuitGraph,
        _library: &CircuitLibrary,
    ) -> Result<(), Error> {
        self.compiled = Some(compiled);
        Ok(())
    }

    fn clear(&mut self) {
        self.compiled = None;
    }

    fn step(&mut self, graph: &mut CircuitGraph) -> Result<(), Error> {
        let Some(compiled) = self.compiled.as_mut() else {
            warn!("scheduled step before any compilation");
            return Ok(());
        };

        let outputs = compiled.simulate(&graph.input_states())?;
        trace!("outputs {outputs:?}");
        graph.set_output_states(&outputs);
        Ok(())
    }
}
