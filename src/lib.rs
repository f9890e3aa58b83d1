#![forbid(unsafe_code)]
//! relplan: logical plan building for SELECT/UNION statements.
//!
//! Re-exports the two workspace crates so callers can depend on one package.

pub use relplan_core;
pub use relplan_planner;

pub use relplan_core::config::PlannerConfig;
pub use relplan_core::plan::Plan;
pub use relplan_core::{Error, Result};
pub use relplan_planner::{build_logical_plan, explain, Catalog, MemoryCatalog};
