#![forbid(unsafe_code)]
//! relplan-core: shared vocabulary for the relplan query planner.
//!
//! Everything here is pure data plus small helpers:
//! - strongly-typed ids (`id`)
//! - schemas and scalar values (`schema`, `types`)
//! - the expression tree carried by filter/project nodes (`expr`)
//! - plan nodes, conventions and trait sets (`plan`)
//! - planner configuration (`config`) and stable hashing (`hash`)
//!
//! No rule, cost, or graph logic lives here; see `relplan-planner` and
//! `relplan-dag`.

pub mod config;
pub mod error;
pub mod expr;
pub mod hash;
pub mod id;
pub mod plan;
pub mod prelude;
pub mod schema;
pub mod trace;
pub mod types;

/// Planner version string, stamped into compiled graphs for provenance.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
