//! Logical plan tree handed to the downstream optimizer.
//!
//! Every node owns its children and its output schema. Nodes are built
//! bottom-up and are not touched again once attached under a parent; a
//! branch that needs the same columns works on its own copy of the schema.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::expr::{AggregateFunction, ByItem, Expression, ScalarFunction};
use crate::fingerprint::Fingerprint;
use crate::id::{OperatorKind, PlanId};
use crate::schema::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LockType {
    #[default]
    None,
    ForUpdate,
    InShareMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSpec {
    pub offset: u64,
    pub count: u64,
}

/// Base table a scan reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTable {
    pub db_name: String,
    pub table_name: String,
    pub alias: Option<String>,
    pub columns: Vec<String>,
    /// Candidate for an equality-join index lookup. Only the optimizer reads it.
    pub ref_access: bool,
}

/// Operator-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlanKind {
    TableScan(ScanTable),
    TableDual,
    Selection {
        conditions: Vec<Expression>,
    },
    SelectLock {
        lock: LockType,
    },
    Projection {
        exprs: Vec<Expression>,
    },
    Aggregation {
        agg_funcs: Vec<AggregateFunction>,
        group_by: Vec<Expression>,
    },
    Join {
        join_type: JoinType,
        eq_conditions: Vec<ScalarFunction>,
        left_conditions: Vec<Expression>,
        right_conditions: Vec<Expression>,
        other_conditions: Vec<Expression>,
    },
    Sort {
        by_items: Vec<ByItem>,
        /// Bounded top-k limit folded in from a LIMIT right above.
        exec_limit: Option<LimitSpec>,
    },
    Limit(LimitSpec),
    Trim,
    Distinct,
    Union,
    Apply {
        inner: Box<Plan>,
        /// Copy of the outer schema the inner plan was resolved against.
        outer_schema: Schema,
    },
    Exists,
    MaxOneRow,
}

impl PlanKind {
    pub fn operator_kind(&self) -> OperatorKind {
        match self {
            PlanKind::TableScan(_) => OperatorKind::TableScan,
            PlanKind::TableDual => OperatorKind::TableDual,
            PlanKind::Selection { .. } => OperatorKind::Selection,
            PlanKind::SelectLock { .. } => OperatorKind::SelectLock,
            PlanKind::Projection { .. } => OperatorKind::Projection,
            PlanKind::Aggregation { .. } => OperatorKind::Aggregation,
            PlanKind::Join { .. } => OperatorKind::Join,
            PlanKind::Sort { .. } => OperatorKind::Sort,
            PlanKind::Limit(_) => OperatorKind::Limit,
            PlanKind::Trim => OperatorKind::Trim,
            PlanKind::Distinct => OperatorKind::Distinct,
            PlanKind::Union => OperatorKind::Union,
            PlanKind::Apply { .. } => OperatorKind::Apply,
            PlanKind::Exists => OperatorKind::Exists,
            PlanKind::MaxOneRow => OperatorKind::MaxOneRow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub kind: PlanKind,
    pub children: Vec<Plan>,
    pub schema: Schema,
    /// Reads, directly or through a child, a column of an enclosing scope.
    pub correlated: bool,
}

impl Plan {
    /// Leaf node.
    pub fn leaf(id: PlanId, kind: PlanKind, schema: Schema) -> Self {
        Self {
            id,
            kind,
            children: Vec::new(),
            schema,
            correlated: false,
        }
    }

    /// Node over `children`; correlation starts as the OR of the children's.
    pub fn with_children(id: PlanId, kind: PlanKind, children: Vec<Plan>, schema: Schema) -> Self {
        let correlated = children.iter().any(|c| c.correlated);
        Self {
            id,
            kind,
            children,
            schema,
            correlated,
        }
    }

    pub fn operator_kind(&self) -> OperatorKind {
        self.kind.operator_kind()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn child(&self, idx: usize) -> Option<&Plan> {
        self.children.get(idx)
    }

    /// Pre-order walk over the node, its children and any apply-inner plans.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Plan)) {
        f(self);
        if let PlanKind::Apply { inner, .. } = &self.kind {
            inner.walk(f);
        }
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Ids of every node in the tree, pre-order.
    pub fn ids(&self) -> Vec<PlanId> {
        let mut out = Vec::new();
        self.walk(&mut |p| out.push(p.id));
        out
    }

    /// First node of the given kind, pre-order.
    pub fn find(&self, kind: OperatorKind) -> Option<&Plan> {
        let mut found = None;
        self.walk(&mut |p| {
            if found.is_none() && p.operator_kind() == kind {
                found = Some(p);
            }
        });
        found
    }

    /// Stable content hash of the whole tree, usable as a plan-cache key.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        Fingerprint::of(self)
    }
}
