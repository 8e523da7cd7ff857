#![forbid(unsafe_code)]
//! relplan-planner: from a `Convention::None` operator tree → logical plan
//! → cheapest physical plan.
//!
//! Design:
//! - Plan nodes come from `relplan-core::plan`; this crate never mutates them.
//! - `rules` holds the converter-rule machinery and the registry keyed by
//!   operator kind; `logical` and `physical` hold the rules themselves.
//! - `physical` also gives each physical operator its schema derivation and
//!   its single compilation entry point (`accept`).
//! - `cost` is a stateless cost function; `metadata` answers the row-count and
//!   selectivity questions it asks.
//! - `optimizer` is a small bottom-up driver that keeps the cheapest
//!   alternative per node. Heavier search strategies can drive the same
//!   rules and cost function.
//! - `dsl` parses YAML pipelines into plans.

pub mod cost;
pub mod dsl;
pub mod explain;
pub mod logical;
pub mod metadata;
pub mod optimizer;
pub mod physical;
pub mod rules;

pub use cost::{adjust_filtered_row_count, compute_self_cost, cumulative_cost, Cost};
pub use dsl::yaml::{apply_pipeline_config, parse_yaml_pipeline, ParsedPipeline, PipelineConfig};
pub use explain::{explain, explain_terms, ExplainTerms};
pub use metadata::{MetadataQuery, StatsMetadataQuery};
pub use optimizer::{OptimizedPlan, Optimizer};
pub use physical::{accept, schema, CreateDagVisitor};
pub use rules::{default_rules, ConverterRule, RuleRegistry};
