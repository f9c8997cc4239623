use itertools::Itertools;
use log::trace;

use crate::{
    Primitive, Slot,
    circuit::GateId,
    compiler::CircuitKey,
    storage::{SignalStore, StoreError},
};

/// What a compiled gate does when it is evaluated.
#[derive(Clone, Debug)]
pub enum Operation {
    Primitive(Primitive),
    /// Copies the bound inputs into the nested circuit's input slots, then runs
    /// it. The nested output slots are the gate's output slots.
    Composite(Box<CompiledGraph>),
}

#[derive(Clone, Debug)]
pub struct CompiledGate {
    pub id: GateId,
    /// One slot per input port; [`Slot::UNCONNECTED`] where nothing drives it.
    pub inputs: Vec<Slot>,
    pub outputs: Vec<Slot>,
    pub operation: Operation,
}

/// One circuit level, scheduled and bound to slots of the shared store.
#[derive(Clone, Debug)]
pub struct CompiledGraph {
    pub key: CircuitKey,
    /// One slot per input node, in node order.
    pub input_slots: Vec<Slot>,
    /// One slot per output node, in node order. Aliases the slot of whatever
    /// drives the node.
    pub output_slots: Vec<Slot>,
    /// Gates in evaluation order.
    pub gates: Vec<CompiledGate>,
    /// Gates evaluated after the acyclic part because they sit on a loop.
    pub feedback_gates: usize,
}

impl CompiledGate {
    fn evaluate(&self, store: &mut SignalStore) -> Result<(), StoreError> {
        match &self.operation {
            Operation::Primitive(primitive) => {
                let port = |index: usize| self.inputs.get(index).copied().unwrap_or(Slot::UNCONNECTED);
                let a = store.get(port(0))?;
                let b = store.get(port(1))?;
                let value = primitive.evaluate(a, b);
                trace!("gate {} {}({a}, {b}) = {value}", self.id, primitive.name());
                let output = self.outputs.first().copied().unwrap_or(Slot::UNCONNECTED);
                store.set(output, value)
            }
            Operation::Composite(nested) => {
                for (from, to) in self.inputs.iter().zip_eq(&nested.input_slots) {
                    let value = store.get(*from)?;
                    store.set(*to, value)?;
                }
                nested.execute(store)
            }
        }
    }
}

impl CompiledGraph {
    /// Evaluates every gate once, in schedule order.
    pub fn execute(&self, store: &mut SignalStore) -> Result<(), StoreError> {
        self.gates
            .iter()
            .try_for_each(|gate| gate.evaluate(store))
    }

    /// Gates on this level and every nested level.
    pub fn gate_count(&self) -> usize {
        self.gates
            .iter()
            .map(|gate| match &gate.operation {
                Operation::Primitive(_) => 1,
                Operation::Composite(nested) => 1 + nested.gate_count(),
            })
            .sum()
    }

    /// How deep composite gates nest below this level.
    pub fn depth(&self) -> usize {
        self.gates
            .iter()
            .filter_map(|gate| match &gate.operation {
                Operation::Composite(nested) => Some(1 + nested.depth()),
                Operation::Primitive(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    pub fn gate(&self, id: GateId) -> Option<&CompiledGate> {
        self.gates.iter().find(|gate| gate.id == id)
    }
}

/// A top-level circuit together with the store all of its levels share.
#[derive(Clone, Debug)]
pub struct CompiledCircuit {
    pub(crate) store: SignalStore,
    pub(crate) root: CompiledGraph,
}

impl CompiledCircuit {
    /// Writes `inputs` into the input slots in node order, runs one
    /// evaluation pass, and reads back the output slots.
    ///
    /// Missing trailing inputs keep their previous value; extra ones are
    /// ignored. Unconnected outputs read `false`.
    pub fn simulate(&mut self, inputs: &[bool]) -> Result<Vec<bool>, StoreError> {
        for (slot, value) in self.root.input_slots.iter().zip(inputs) {
            self.store.set(*slot, *value)?;
        }
        self.root.execute(&mut self.store)?;
        self.outputs()
    }

    /// Output values as of the last pass.
    pub fn outputs(&self) -> Result<Vec<bool>, StoreError> {
        self.root
            .output_slots
            .iter()
            .map(|slot| self.store.get(*slot))
            .collect()
    }

    pub fn root(&self) -> &CompiledGraph {
        &self.root
    }

    pub fn store(&self) -> &SignalStore {
        &self.store
    }

    /// Slots allocated across every level.
    pub fn slot_count(&self) -> usize {
        self.store.len()
    }

    /// Clears every signal back to `false`, keeping the binding.
    pub fn reset(&mut self) {
        self.store.reset();
    }
}
