//! Strongly-typed record identifiers.
//!
//! All three id kinds are allocated by the history store from monotonic
//! counters, so ordering by id is ordering by creation time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one world (one simulation instance bound to a plugin).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WorldId(pub u64);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for WorldId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies one stage row.
///
/// Within a world, a larger `StageId` always means a later stage; the
/// stage with the highest id is the world's current stage.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StageId(pub u64);

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StageId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies one persisted tick outcome.
///
/// The step with the highest id for a world is its "last step", the
/// point a run resumes from.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StepId(pub u64);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_numbers() {
        assert_eq!(serde_json::to_string(&WorldId(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&StepId(42)).unwrap(), "42");
        let stage: StageId = serde_json::from_str("3").unwrap();
        assert_eq!(stage, StageId(3));
    }

    #[test]
    fn ids_order_by_value() {
        assert!(StepId(1) < StepId(2));
        assert_eq!(format!("{}", StageId(9)), "9");
    }
}
