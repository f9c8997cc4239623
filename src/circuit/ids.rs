use std::fmt;

use rand::Rng;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};

/// Upper bound (inclusive) of randomly generated identifiers.
pub const MAX_ID: u64 = 100_000_000;

/// How many random draws are attempted before giving up on a fresh id.
pub const MAX_ID_ATTEMPTS: usize = 1_000;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);

        impl $name {
            /// Draws a random id that `taken` does not already contain.
            pub fn random(
                rng: &mut impl Rng,
                taken: impl Fn(&Self) -> bool,
            ) -> Option<Self> {
                (0..MAX_ID_ATTEMPTS)
                    .map(|_| Self(rng.random_range(0..=MAX_ID)))
                    .find(|id| !taken(id))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u64(self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(IdVisitor).map(Self)
            }
        }
    };
}

id_type!(
    /// Identifier of a gate instance within one circuit graph.
    GateId
);
id_type!(
    /// Identifier of an input or output node within one circuit graph.
    NodeId
);

/// Ids were generated as integers but end up as object keys (strings) in the
/// persisted form, and links may carry either spelling.
struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = u64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an integer id or a string holding one")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
        Ok(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
        u64::try_from(value).map_err(|_| E::custom(format!("negative id {value}")))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<u64, E> {
        if value.fract() == 0.0 && value >= 0.0 && value <= u64::MAX as f64 {
            Ok(value as u64)
        } else {
            Err(E::custom(format!("id {value} is not a whole number")))
        }
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
        value
            .parse()
            .map_err(|_| E::custom(format!("id {value:?} is not an integer")))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn accepts_numbers_and_strings() {
        let from_number: GateId = serde_json::from_str("42").unwrap();
        let from_string: GateId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_number, GateId(42));
        assert_eq!(from_string, GateId(42));
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<NodeId>("\"abc\"").is_err());
        assert!(serde_json::from_str::<NodeId>("-1").is_err());
        assert!(serde_json::from_str::<NodeId>("1.5").is_err());
    }

    #[test]
    fn works_as_map_key() {
        let map: std::collections::BTreeMap<GateId, bool> =
            serde_json::from_str(r#"{"7": true, "3": false}"#).unwrap();
        assert_eq!(map.get(&GateId(7)), Some(&true));

        let text = serde_json::to_string(&map).unwrap();
        assert_eq!(text, r#"{"3":false,"7":true}"#);
    }

    #[test]
    fn random_skips_taken_ids() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let first = GateId::random(&mut rng, |_| false).unwrap();
        assert!(first.0 <= MAX_ID);

        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let second = GateId::random(&mut rng, |id| *id == first).unwrap();
        assert_ne!(first, second);

        assert_eq!(GateId::random(&mut rng, |_| true), None);
    }
}
