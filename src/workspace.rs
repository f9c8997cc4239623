//! The circuit being edited, with its library and a lazily rebuilt compiled
//! form.
//!
//! Structural edits only mark the workspace dirty. The next [`tick`] compiles
//! the graph again and hands the result to the simulation mode; ticks in
//! between reuse what was prepared. Changing an input node state is not a
//! structural edit.
//!
//! [`tick`]: Workspace::tick

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{info, warn};

use crate::{
    Error, Primitive,
    circuit::{
        CircuitGraph, CircuitLibrary, GateId, GateInstance, InputNode, NodeId, OutputNode,
    },
    compiler::{self, CompiledCircuit},
    config::SimulatorConfig,
    simulator::{Scheduled, SimulationMode},
};

pub struct Workspace<M: SimulationMode = Scheduled> {
    graph: CircuitGraph,
    library: CircuitLibrary,
    config: SimulatorConfig,
    /// Library name the graph was last saved under.
    name: Option<String>,
    rng: ChaCha20Rng,
    mode: M,
    dirty: bool,
    compilations: usize,
    ticks: u64,
}

impl<M: SimulationMode + Default> Workspace<M> {
    pub fn new(config: SimulatorConfig) -> Result<Self, Error> {
        Self::with_rng(config, ChaCha20Rng::from_rng(&mut rand::rng()))
    }

    /// A workspace whose generated ids are reproducible.
    pub fn with_seed(config: SimulatorConfig, seed: u64) -> Result<Self, Error> {
        Self::with_rng(config, ChaCha20Rng::seed_from_u64(seed))
    }

    fn with_rng(config: SimulatorConfig, rng: ChaCha20Rng) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            graph: CircuitGraph::new(),
            library: CircuitLibrary::new(),
            config,
            name: None,
            rng,
            mode: M::default(),
            dirty: true,
            compilations: 0,
            ticks: 0,
        })
    }
}

impl<M: SimulationMode> Workspace<M> {
    pub fn graph(&self) -> &CircuitGraph {
        &self.graph
    }

    pub fn library(&self) -> &CircuitLibrary {
        &self.library
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn mode(&self) -> &M {
        &self.mode
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Successful compilations so far.
    pub fn compilations(&self) -> usize {
        self.compilations
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Replaces the library. Composite references resolve against it on the
    /// next tick.
    pub fn set_library(&mut self, library: CircuitLibrary) {
        self.library = library;
        self.dirty = true;
    }

    /// Replaces the graph being edited.
    pub fn load(&mut self, graph: CircuitGraph, name: Option<String>) {
        self.graph = graph;
        self.name = name;
        self.dirty = true;
    }

    pub fn load_json(&mut self, text: &str) -> Result<(), Error> {
        let graph = CircuitGraph::from_json(text)?;
        self.load(graph, None);
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(self.graph.to_json()?)
    }

    /// Saves a copy of the current graph into the library under `name`.
    pub fn save_as(&mut self, name: &str) -> Result<(), Error> {
        self.library.save(name, self.graph.clone())?;
        self.name = Some(name.to_string());
        self.dirty = true;
        info!(circuit = name, "saved to library");
        Ok(())
    }

    /// Starts over with an empty, unnamed graph. The library is kept.
    pub fn clear(&mut self) {
        self.load(CircuitGraph::new(), None);
    }

    /// Compiles if needed, then advances the simulation by one tick.
    pub fn tick(&mut self) -> Result<(), Error> {
        if self.dirty {
            self.recompile()?;
        }
        self.mode.step(&mut self.graph)?;
        self.ticks += 1;
        Ok(())
    }

    pub fn run(&mut self, ticks: usize) -> Result<(), Error> {
        (0..ticks).try_for_each(|_| self.tick())
    }

    fn recompile(&mut self) -> Result<(), Error> {
        let span = tracing::info_span!("compile", circuit = self.name.as_deref().unwrap_or("-"));
        let _enter = span.enter();

        match self.compile() {
            Ok(compiled) => {
                info!(
                    gates = compiled.root().gate_count(),
                    slots = compiled.slot_count(),
                    "compiled"
                );
                self.mode.prepare(compiled, &self.graph, &self.library)?;
                self.compilations += 1;
                self.dirty = false;
                Ok(())
            }
            Err(err) => {
                warn!("compilation failed: {err}");
                self.mode.clear();
                Err(err.into())
            }
        }
    }

    /// The workspace is keyed by structure even after `save_as`: the library
    /// keeps the saved snapshot, and nesting that snapshot is not recursion.
    fn compile(&self) -> Result<CompiledCircuit, compiler::CompileError> {
        compiler::compile(&self.graph, &self.library, &self.config)
    }

    pub fn input_states(&self) -> Vec<bool> {
        self.graph.input_states()
    }

    pub fn output_states(&self) -> Vec<bool> {
        self.graph.output_states()
    }

    pub fn set_input(&mut self, node: NodeId, state: bool) -> Result<(), Error> {
        Ok(self.graph.set_input_state(node, state)?)
    }

    /// Flips an input node and returns its new state.
    pub fn toggle_input(&mut self, node: NodeId) -> Result<bool, Error> {
        Ok(self.graph.toggle_input(node)?)
    }

    pub fn set_inputs(&mut self, states: &[bool]) {
        self.graph.set_input_states(states);
    }

    pub fn place_primitive(
        &mut self,
        primitive: Primitive,
        position: [f64; 2],
    ) -> Result<GateId, Error> {
        self.place(GateInstance::primitive(primitive).at(position))
    }

    /// Places a composite gate carrying a private copy of library circuit
    /// `name`. Later changes to the library do not affect it.
    pub fn place_copy(&mut self, name: &str, position: [f64; 2]) -> Result<GateId, Error> {
        let circuit = self.library.get(name)?.clone();
        self.place(GateInstance::embedding(name, circuit).at(position))
    }

    /// Places a composite gate that runs library circuit `name` as it is at
    /// each compilation.
    pub fn place_reference(&mut self, name: &str, position: [f64; 2]) -> Result<GateId, Error> {
        let gate = GateInstance::referencing(name, self.library.get(name)?);
        self.place(gate.at(position))
    }

    pub fn place(&mut self, gate: GateInstance) -> Result<GateId, Error> {
        let id = self.graph.add_gate(&mut self.rng, gate)?;
        self.dirty = true;
        Ok(id)
    }

    pub fn add_input_node(&mut self, name: &str, position: f64) -> Result<NodeId, Error> {
        let id = self
            .graph
            .add_input_node(&mut self.rng, InputNode::new(name, position))?;
        self.dirty = true;
        Ok(id)
    }

    pub fn add_output_node(&mut self, name: &str, position: f64) -> Result<NodeId, Error> {
        let id = self
            .graph
            .add_output_node(&mut self.rng, OutputNode::new(name, position))?;
        self.dirty = true;
        Ok(id)
    }

    pub fn add_link(
        &mut self,
        source: GateId,
        source_port: usize,
        target: GateId,
        target_port: usize,
    ) -> Result<(), Error> {
        self.graph
            .add_link(source, source_port, target, target_port)?;
        self.dirty = true;
        Ok(())
    }

    pub fn link_input_node(&mut self, node: NodeId, gate: GateId, port: usize) -> Result<(), Error> {
        self.graph.link_input_node(node, gate, port)?;
        self.dirty = true;
        Ok(())
    }

    pub fn link_output_node(
        &mut self,
        node: NodeId,
        gate: GateId,
        port: usize,
    ) -> Result<(), Error> {
        self.graph.link_output_node(node, gate, port)?;
        self.dirty = true;
        Ok(())
    }

    pub fn clear_input_link(&mut self, gate: GateId, port: usize) -> Result<bool, Error> {
        let removed = self.graph.clear_input_link(gate, port)?;
        self.dirty |= removed;
        Ok(removed)
    }

    pub fn clear_output_node(&mut self, node: NodeId) -> Result<bool, Error> {
        let removed = self.graph.clear_output_node(node)?;
        self.dirty |= removed;
        Ok(removed)
    }

    pub fn remove_gate(&mut self, gate: GateId) -> Result<GateInstance, Error> {
        let removed = self.graph.remove_gate(gate)?;
        self.dirty = true;
        Ok(removed)
    }

    pub fn remove_input_node(&mut self, node: NodeId) -> Result<InputNode, Error> {
        let removed = self.graph.remove_input_node(node)?;
        self.dirty = true;
        Ok(removed)
    }

    pub fn remove_output_node(&mut self, node: NodeId) -> Result<OutputNode, Error> {
        let removed = self.graph.remove_output_node(node)?;
        self.dirty = true;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::{
        circuit::GraphError,
        simulator::Propagate,
        test_utils::{self_containing_library, xor_graph},
    };

    fn workspace() -> Workspace {
        Workspace::with_seed(SimulatorConfig::default(), 7).unwrap()
    }

    #[test]
    fn starts_dirty_and_compiles_once() {
        let mut ws = workspace();
        assert!(ws.is_dirty());
        ws.load(xor_graph(), None);

        ws.run(5).unwrap();
        assert!(!ws.is_dirty());
        assert_eq!(ws.compilations(), 1);
        assert_eq!(ws.ticks(), 5);
    }

    #[test]
    fn toggling_inputs_does_not_recompile() {
        let mut ws = workspace();
        ws.load(xor_graph(), None);
        ws.tick().unwrap();

        let a = *ws.graph().input_nodes.keys().next().unwrap();
        assert!(ws.toggle_input(a).unwrap());
        assert!(!ws.is_dirty());
        ws.tick().unwrap();

        assert_eq!(ws.output_states(), [true]);
        assert_eq!(ws.compilations(), 1);
    }

    #[test]
    fn structural_edit_recompiles() {
        let mut ws = workspace();
        let input = ws.add_input_node("a", 0.5).unwrap();
        let output = ws.add_output_node("q", 0.5).unwrap();
        let not = ws.place_primitive(Primitive::Not, [0.5, 0.5]).unwrap();
        ws.link_input_node(input, not, 0).unwrap();
        ws.link_output_node(output, not, 0).unwrap();

        ws.tick().unwrap();
        assert_eq!(ws.output_states(), [true]);

        ws.clear_input_link(not, 0).unwrap();
        ws.set_input(input, true).unwrap();
        ws.tick().unwrap();
        assert_eq!(ws.output_states(), [true]);
        assert_eq!(ws.compilations(), 2);

        ws.link_input_node(input, not, 0).unwrap();
        ws.tick().unwrap();
        assert_eq!(ws.output_states(), [false]);
        assert_eq!(ws.compilations(), 3);
    }

    #[test]
    fn clearing_nothing_is_not_an_edit() {
        let mut ws = workspace();
        let output = ws.add_output_node("q", 0.5).unwrap();
        ws.tick().unwrap();

        assert!(!ws.clear_output_node(output).unwrap());
        assert!(!ws.is_dirty());
    }

    #[test]
    fn failed_compile_stays_dirty() {
        let mut ws = Workspace::<Scheduled>::with_seed(
            SimulatorConfig::default().with_signal_capacity(3),
            7,
        )
        .unwrap();
        ws.load(xor_graph(), None);

        assert!(matches!(ws.tick(), Err(Error::Compile(_))));
        assert!(ws.is_dirty());
        assert!(ws.mode().compiled().is_none());
        assert_eq!(ws.ticks(), 0);
    }

    #[test]
    fn rejected_edit_keeps_graph_clean() {
        let mut ws = workspace();
        ws.load(xor_graph(), None);
        ws.tick().unwrap();

        let a = *ws.graph().input_nodes.keys().next().unwrap();
        let first_gate = *ws.graph().gates.keys().next().unwrap();
        let before = ws.graph().clone();

        assert!(matches!(
            ws.link_input_node(a, first_gate, 0),
            Err(Error::Graph(GraphError::FanInViolation { .. }))
        ));
        assert_eq!(ws.graph(), &before);
        assert!(!ws.is_dirty());
    }

    #[test]
    fn saved_circuit_can_be_placed_as_copy_or_reference() {
        let mut ws = workspace();
        ws.load(xor_graph(), None);
        ws.save_as("xor").unwrap();
        assert_eq!(ws.name(), Some("xor"));
        ws.clear();

        let copy = ws.place_copy("xor", [0.3, 0.5]).unwrap();
        let reference = ws.place_reference("xor", [0.7, 0.5]).unwrap();
        let a = ws.add_input_node("a", 0.3).unwrap();
        let b = ws.add_input_node("b", 0.7).unwrap();
        let x = ws.add_output_node("copy", 0.3).unwrap();
        let y = ws.add_output_node("reference", 0.7).unwrap();
        for gate in [copy, reference] {
            ws.link_input_node(a, gate, 0).unwrap();
            ws.link_input_node(b, gate, 1).unwrap();
        }
        ws.link_output_node(x, copy, 0).unwrap();
        ws.link_output_node(y, reference, 0).unwrap();

        ws.set_inputs(&[true, false]);
        ws.tick().unwrap();
        assert_eq!(ws.output_states(), [true, true]);
    }

    #[test]
    fn saved_snapshot_nests_inside_its_own_workspace() {
        let mut ws = workspace();
        ws.load(xor_graph(), None);
        ws.save_as("xor").unwrap();
        assert_eq!(ws.name(), Some("xor"));

        // the library keeps the snapshot, so this is one level of nesting
        let inputs: Vec<NodeId> = ws.graph().input_nodes.keys().copied().collect();
        let inner = ws.place_reference("xor", [0.5, 0.5]).unwrap();
        for (port, node) in inputs.into_iter().enumerate() {
            ws.link_input_node(node, inner, port).unwrap();
        }
        let nested = ws.add_output_node("nested", 0.9).unwrap();
        ws.link_output_node(nested, inner, 0).unwrap();

        ws.set_inputs(&[true, false]);
        ws.tick().unwrap();
        assert_eq!(ws.output_states(), [true, true]);
        ws.set_inputs(&[true, true]);
        ws.tick().unwrap();
        assert_eq!(ws.output_states(), [false, false]);
    }

    #[test]
    fn self_containing_library_circuit_fails_in_both_modes() {
        let library = self_containing_library();
        let looped = library.get("loop").unwrap().clone();

        let mut scheduled = workspace();
        scheduled.set_library(library.clone());
        scheduled.load(looped.clone(), None);
        assert!(matches!(
            scheduled.tick(),
            Err(Error::Compile(compiler::CompileError::RecursiveSelfReference { .. }))
        ));
        assert!(scheduled.is_dirty());

        let mut propagate =
            Workspace::<Propagate>::with_seed(SimulatorConfig::default(), 7).unwrap();
        propagate.set_library(library);
        propagate.load(looped, None);
        assert!(matches!(
            propagate.tick(),
            Err(Error::Compile(compiler::CompileError::RecursiveSelfReference { .. }))
        ));
        assert!(propagate.mode().state().is_none());
    }

    #[test]
    fn propagate_mode_settles() {
        let mut ws = Workspace::<Propagate>::with_seed(SimulatorConfig::default(), 7).unwrap();
        ws.load(xor_graph(), None);
        ws.set_inputs(&[true, false]);

        ws.tick().unwrap();
        assert_eq!(ws.output_states(), [false]);
        ws.tick().unwrap();
        assert_eq!(ws.output_states(), [true]);
        assert_eq!(ws.compilations(), 1);
    }
}
