pub mod gate_type;
pub mod slot;
