//! Convenient re-exports for downstream crates.

pub use crate::config::PlannerConfig;
pub use crate::error::{Error, Result};
pub use crate::expr::{
    funcs, AggFunc, AggregateFunction, ByItem, Constant, Expression, ScalarFunction,
};
pub use crate::fingerprint::Fingerprint;
pub use crate::id::{AggNodeId, OperatorKind, PlanId};
pub use crate::plan::{JoinType, LimitSpec, LockType, Plan, PlanKind, ScanTable};
pub use crate::schema::{Column, ColumnName, Schema};
pub use crate::types::{DataType, Datum, FieldType, UNSPECIFIED_LENGTH};
