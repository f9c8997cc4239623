use std::{fmt, ops::Deref};

/// Handle of one boolean cell in a [`SignalStore`](crate::SignalStore).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(pub usize);

impl Slot {
    /// Marks a port that nothing drives. Reads as `false`, writes are dropped.
    pub const UNCONNECTED: Slot = Slot(usize::MAX);

    pub fn is_connected(&self) -> bool {
        *self != Self::UNCONNECTED
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNCONNECTED => write!(f, "-"),
            Slot(index) => write!(f, "{index}"),
        }
    }
}

impl Deref for Slot {
    type Target = usize;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
