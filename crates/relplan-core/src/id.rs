//! Strongly-typed identifiers used across the planner.
//!
//! Builders should *not* pass raw integers or ad hoc strings around as ids.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

// Identity of one aggregate call node in a statement AST.
new_id!(AggNodeId);

/// The closed set of logical operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub enum OperatorKind {
    TableScan,
    TableDual,
    Selection,
    SelectLock,
    Projection,
    Aggregation,
    Join,
    Sort,
    Limit,
    Trim,
    Distinct,
    Union,
    Apply,
    Exists,
    MaxOneRow,
}

impl OperatorKind {
    pub const fn name(self) -> &'static str {
        match self {
            OperatorKind::TableScan => "TableScan",
            OperatorKind::TableDual => "TableDual",
            OperatorKind::Selection => "Selection",
            OperatorKind::SelectLock => "SelectLock",
            OperatorKind::Projection => "Projection",
            OperatorKind::Aggregation => "Aggregation",
            OperatorKind::Join => "Join",
            OperatorKind::Sort => "Sort",
            OperatorKind::Limit => "Limit",
            OperatorKind::Trim => "Trim",
            OperatorKind::Distinct => "Distinct",
            OperatorKind::Union => "Union",
            OperatorKind::Apply => "Apply",
            OperatorKind::Exists => "Exists",
            OperatorKind::MaxOneRow => "MaxOneRow",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Session-unique operator id, rendered as `<Kind>_<seq>` (e.g. `Projection_3`).
///
/// Output columns point back at the operator that produced them through this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct PlanId {
    kind: OperatorKind,
    seq: u64,
}

impl PlanId {
    pub const fn new(kind: OperatorKind, seq: u64) -> Self {
        Self { kind, seq }
    }

    pub const fn kind(self) -> OperatorKind {
        self.kind
    }

    pub const fn seq(self) -> u64 {
        self.seq
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind, self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_id_renders_kind_and_sequence() {
        let id = PlanId::new(OperatorKind::Projection, 3);
        assert_eq!(id.to_string(), "Projection_3");
        assert_eq!(id.kind(), OperatorKind::Projection);
        assert_eq!(id.seq(), 3);
    }

    #[test]
    fn agg_node_id_display() {
        assert_eq!(AggNodeId::new(7).to_string(), "AggNodeId(7)");
    }
}
