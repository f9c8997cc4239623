//! Structural edits, as the editor applies them between simulation ticks.
//!
//! Every operation validates ids and port indices up front and leaves the
//! graph untouched when it fails. Fan-in is enforced here: an input port that
//! is already driven rejects a second link instead of silently rewiring.

use log::debug;
use rand::Rng;

use crate::circuit::{
    CircuitGraph, GateId, GateInstance, GateLink, GraphError, InputLink, InputNode, NodeId,
    OutputLink, OutputNode,
};

impl CircuitGraph {
    /// Places `gate` under a fresh random id.
    pub fn add_gate(
        &mut self,
        rng: &mut impl Rng,
        gate: GateInstance,
    ) -> Result<GateId, GraphError> {
        let id = GateId::random(rng, |id| self.gates.contains_key(id))
            .ok_or(GraphError::IdSpaceExhausted)?;
        debug!("add gate {id} ({})", gate.name);
        self.gates.insert(id, gate);
        Ok(id)
    }

    pub fn add_input_node(
        &mut self,
        rng: &mut impl Rng,
        node: InputNode,
    ) -> Result<NodeId, GraphError> {
        let id = NodeId::random(rng, |id| self.input_nodes.contains_key(id))
            .ok_or(GraphError::IdSpaceExhausted)?;
        self.input_nodes.insert(id, node);
        Ok(id)
    }

    pub fn add_output_node(
        &mut self,
        rng: &mut impl Rng,
        node: OutputNode,
    ) -> Result<NodeId, GraphError> {
        let id = NodeId::random(rng, |id| self.output_nodes.contains_key(id))
            .ok_or(GraphError::IdSpaceExhausted)?;
        self.output_nodes.insert(id, node);
        Ok(id)
    }

    /// Wires output `source_port` of `source` into input `target_port` of `target`.
    pub fn add_link(
        &mut self,
        source: GateId,
        source_port: usize,
        target: GateId,
        target_port: usize,
    ) -> Result<(), GraphError> {
        self.check_output_port(source, source_port)?;
        self.check_free_input_port(target, target_port)?;

        debug!("link {source}.{source_port} -> {target}.{target_port}");
        self.gates
            .get_mut(&source)
            .ok_or(GraphError::UnknownGate(source))?
            .links
            .push(GateLink {
                target,
                target_port,
                source_port,
            });
        Ok(())
    }

    /// Wires an input node into input `port` of `gate`.
    pub fn link_input_node(
        &mut self,
        node: NodeId,
        gate: GateId,
        port: usize,
    ) -> Result<(), GraphError> {
        self.input_node(node)?;
        self.check_free_input_port(gate, port)?;

        self.input_nodes
            .get_mut(&node)
            .ok_or(GraphError::UnknownInputNode(node))?
            .links
            .push(InputLink {
                target: gate,
                target_port: port,
            });
        Ok(())
    }

    /// Makes output node `node` read output `port` of `gate`, replacing any
    /// previous link of that node.
    pub fn link_output_node(
        &mut self,
        node: NodeId,
        gate: GateId,
        port: usize,
    ) -> Result<(), GraphError> {
        self.check_output_port(gate, port)?;

        let output = self
            .output_nodes
            .get_mut(&node)
            .ok_or(GraphError::UnknownOutputNode(node))?;
        output.links = vec![OutputLink {
            source: gate,
            source_port: port,
        }];
        Ok(())
    }

    /// Removes whatever drives input `port` of `gate`. Returns whether a link
    /// was removed.
    pub fn clear_input_link(&mut self, gate: GateId, port: usize) -> Result<bool, GraphError> {
        self.check_input_port(gate, port)?;

        let drives = |target: GateId, target_port: usize| target == gate && target_port == port;
        let mut removed = 0;

        for instance in self.gates.values_mut() {
            let before = instance.links.len();
            instance
                .links
                .retain(|link| !drives(link.target, link.target_port));
            removed += before - instance.links.len();
        }
        for node in self.input_nodes.values_mut() {
            let before = node.links.len();
            node.links
                .retain(|link| !drives(link.target, link.target_port));
            removed += before - node.links.len();
        }

        Ok(removed > 0)
    }

    /// Unlinks an output node. Returns whether it had a link.
    pub fn clear_output_node(&mut self, node: NodeId) -> Result<bool, GraphError> {
        let output = self
            .output_nodes
            .get_mut(&node)
            .ok_or(GraphError::UnknownOutputNode(node))?;
        let had_link = !output.links.is_empty();
        output.links.clear();
        Ok(had_link)
    }

    /// Deletes a gate along with every link that touches it.
    pub fn remove_gate(&mut self, gate: GateId) -> Result<GateInstance, GraphError> {
        let removed = self
            .gates
            .shift_remove(&gate)
            .ok_or(GraphError::UnknownGate(gate))?;

        for instance in self.gates.values_mut() {
            instance.links.retain(|link| link.target != gate);
        }
        for node in self.input_nodes.values_mut() {
            node.links.retain(|link| link.target != gate);
        }
        for node in self.output_nodes.values_mut() {
            node.links.retain(|link| link.source != gate);
        }

        debug!("removed gate {gate} ({})", removed.name);
        Ok(removed)
    }

    /// Deletes an input node. Later nodes shift down one port.
    pub fn remove_input_node(&mut self, node: NodeId) -> Result<InputNode, GraphError> {
        self.input_nodes
            .shift_remove(&node)
            .ok_or(GraphError::UnknownInputNode(node))
    }

    /// Deletes an output node. Later nodes shift down one port.
    pub fn remove_output_node(&mut self, node: NodeId) -> Result<OutputNode, GraphError> {
        self.output_nodes
            .shift_remove(&node)
            .ok_or(GraphError::UnknownOutputNode(node))
    }

    /// Sets the state of an input node. Not a structural edit.
    pub fn set_input_state(&mut self, node: NodeId, state: bool) -> Result<(), GraphError> {
        self.input_nodes
            .get_mut(&node)
            .ok_or(GraphError::UnknownInputNode(node))?
            .state = state;
        Ok(())
    }

    /// Flips the state of an input node and returns the new state.
    pub fn toggle_input(&mut self, node: NodeId) -> Result<bool, GraphError> {
        let input = self
            .input_nodes
            .get_mut(&node)
            .ok_or(GraphError::UnknownInputNode(node))?;
        input.state = !input.state;
        Ok(input.state)
    }

    fn check_input_port(&self, gate: GateId, port: usize) -> Result<(), GraphError> {
        if port < self.gate(gate)?.input_arity() {
            Ok(())
        } else {
            Err(GraphError::NoSuchInputPort { gate, port })
        }
    }

    fn check_free_input_port(&self, gate: GateId, port: usize) -> Result<(), GraphError> {
        self.check_input_port(gate, port)?;
        match self.driver_of(gate, port) {
            None => Ok(()),
            Some(_) => Err(GraphError::FanInViolation { gate, port }),
        }
    }

    fn check_output_port(&self, gate: GateId, port: usize) -> Result<(), GraphError> {
        if port < self.gate(gate)?.output_arity() {
            Ok(())
        } else {
            Err(GraphError::NoSuchOutputPort { gate, port })
        }
    }
}
