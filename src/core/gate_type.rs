use serde::{Deserialize, Serialize};

/// Kind of a gate instance as stored in the persisted form (`"type": 0..=3`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GateKind {
    And = 0,
    Or = 1,
    Not = 2,
    /// Behaviour is defined by a nested circuit rather than a truth table.
    Composite = 3,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Unknown gate type tag {0}")]
pub struct UnknownGateKind(pub u8);

impl TryFrom<u8> for GateKind {
    type Error = UnknownGateKind;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::And),
            1 => Ok(Self::Or),
            2 => Ok(Self::Not),
            3 => Ok(Self::Composite),
            other => Err(UnknownGateKind(other)),
        }
    }
}

impl From<GateKind> for u8 {
    fn from(kind: GateKind) -> u8 {
        kind as u8
    }
}

impl GateKind {
    pub const fn primitive(self) -> Option<Primitive> {
        match self {
            GateKind::And => Some(Primitive::And),
            GateKind::Or => Some(Primitive::Or),
            GateKind::Not => Some(Primitive::Not),
            GateKind::Composite => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite)
    }
}

/// The primitive gates. Every primitive has exactly one output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    And,
    Or,
    Not,
}

impl Primitive {
    pub const ALL: [Primitive; 3] = [Primitive::And, Primitive::Or, Primitive::Not];

    /// Boolean function of the gate. Unary gates ignore the second argument.
    pub const fn f(&self) -> fn(bool, bool) -> bool {
        match self {
            Primitive::And => |a, b| a & b,
            Primitive::Or => |a, b| a | b,
            Primitive::Not => |a, _| !a,
        }
    }

    pub fn evaluate(&self, a: bool, b: bool) -> bool {
        (self.f())(a, b)
    }

    pub const fn input_arity(&self) -> usize {
        match self {
            Primitive::And | Primitive::Or => 2,
            Primitive::Not => 1,
        }
    }

    pub const fn output_arity(&self) -> usize {
        1
    }

    pub const fn kind(&self) -> GateKind {
        match self {
            Primitive::And => GateKind::And,
            Primitive::Or => GateKind::Or,
            Primitive::Not => GateKind::Not,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Primitive::And => "AND",
            Primitive::Or => "OR",
            Primitive::Not => "NOT",
        }
    }

    /// Port labels a freshly placed gate gets in the editor palette.
    pub fn default_labels(&self) -> (Vec<String>, Vec<String>) {
        let labels = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        match self {
            Primitive::And | Primitive::Or => (labels(&["A", "B"]), labels(&["C"])),
            Primitive::Not => (labels(&["A"]), labels(&["B"])),
        }
    }

    /// 4-bit truth table (bit0=f(0,0), bit1=f(0,1), bit2=f(1,0), bit3=f(1,1))
    pub fn truth_table(&self) -> u8 {
        let f = self.f();
        [(false, false), (false, true), (true, false), (true, true)]
            .into_iter()
            .enumerate()
            .filter(|(_, (a, b))| f(*a, *b))
            .fold(0u8, |tt, (bit, _)| tt | (1 << bit))
    }
}
