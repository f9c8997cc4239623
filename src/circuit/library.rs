use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::circuit::{CircuitGraph, GraphError, Representation};

/// Saved circuits by name, in the shape the persistence service keeps per user.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircuitLibrary {
    circuits: IndexMap<String, CircuitGraph>,
}

impl CircuitLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Stores `circuit` under a new name. Existing names are never overwritten.
    pub fn save(&mut self, name: &str, circuit: CircuitGraph) -> Result<(), GraphError> {
        if !is_valid_name(name) {
            return Err(GraphError::InvalidCircuitName(name.to_string()));
        }
        if self.circuits.contains_key(name) {
            return Err(GraphError::CircuitNameTaken(name.to_string()));
        }
        self.circuits.insert(name.to_string(), circuit);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&CircuitGraph, GraphError> {
        self.circuits
            .get(name)
            .ok_or_else(|| GraphError::UnknownCircuit(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Result<CircuitGraph, GraphError> {
        self.circuits
            .shift_remove(name)
            .ok_or_else(|| GraphError::UnknownCircuit(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.circuits.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }

    /// The circuit a composite gate runs.
    pub fn resolve<'a>(
        &'a self,
        representation: &'a Representation,
    ) -> Result<&'a CircuitGraph, GraphError> {
        match representation {
            Representation::Embedded(circuit) => Ok(circuit.as_ref()),
            Representation::Library(name) => self.get(name),
        }
    }
}

/// Letters, digits, `_` and `-`; at least one character.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
