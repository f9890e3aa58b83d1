#![forbid(unsafe_code)]
//! relplan-core: the vocabulary shared by the plan builder and whoever
//! consumes its output.
//!
//! - ids (`PlanId`, `AggNodeId`)
//! - field types and literals
//! - columns and ordered schemas
//! - resolved expressions
//! - the logical `Plan` tree
//! - error taxonomy, planner config, plan fingerprints
//!
//! **No AST, no catalog, no builders** here. Those live in `relplan-planner`.

pub mod config;
pub mod error;
pub mod expr;
pub mod fingerprint;
pub mod id;
pub mod plan;
pub mod prelude;
pub mod schema;
pub mod types;

pub use error::{Error, Result};

/// Crate version, recorded by callers for provenance.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
