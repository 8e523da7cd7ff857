//! YAML → plan parser for *linear* pipelines.
//!
//! Example:
//! ```yaml
//! config:
//!   cost_ordering: rows_then_cpu
//!   fuse_operators: true
//! containers:
//!   - { name: orders, kind: partitioned_map, partitions: 16, entries: 50000 }
//! steps:
//!   - op: scan
//!     source: orders
//!     schema:
//!       - { name: id,     type: Int64,   nullable: false }
//!       - { name: amount, type: Float64, nullable: true }
//!   - op: filter
//!     expr: "amount > 100"
//!   - op: project
//!     columns: ["id", "amount * 2 AS doubled"]
//!   - op: root
//! ```
//!
//! A trailing `root` step is added when the pipeline does not end in one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use relplan_core::config::{CostOrdering, PlannerConfig};
use relplan_core::expr::Expr;
use relplan_core::plan::{Operator, PlanNode};
use relplan_core::schema::{DataType, Field, Schema};
use relplan_stats::{ContainerCatalog, ContainerKind, PartitionedMap, ReplicatedMap};

use super::expr::{parse_expr, parse_projection_item};
use super::{DslError, Result};

/// Partition count used when a partitioned map does not say.
pub const DEFAULT_PARTITION_COUNT: usize = 271;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub config: Option<PipelineConfig>,
    #[serde(default)]
    pub containers: Vec<ContainerDef>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Step {
    Scan {
        source: String,
        schema: Vec<FieldDef>,
    },
    Filter {
        expr: String,
    },
    Project {
        columns: Vec<String>,
    },
    Root,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub nullable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDef {
    pub name: String,
    pub kind: ContainerKind,
    #[serde(default)]
    pub partitions: Option<usize>,
    #[serde(default)]
    pub entries: u64,
}

/// Planner settings a pipeline may override. Unset fields keep whatever
/// the environment (or defaults) provided.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cost_ordering: Option<CostOrdering>,
    pub min_filtered_rows: Option<f64>,
    pub default_selectivity: Option<f64>,
    pub project_cpu_per_expr: Option<f64>,
    pub fuse_operators: Option<bool>,
    pub local_parallelism: Option<u32>,
    pub stats_refresh_ms: Option<u64>,
}

pub fn apply_pipeline_config(config: &mut PlannerConfig, overrides: &PipelineConfig) {
    if let Some(v) = overrides.cost_ordering {
        config.cost_ordering = v;
    }
    if let Some(v) = overrides.min_filtered_rows {
        config.min_filtered_rows = v;
    }
    if let Some(v) = overrides.default_selectivity {
        config.default_selectivity = v;
    }
    if let Some(v) = overrides.project_cpu_per_expr {
        config.project_cpu_per_expr = v;
    }
    if let Some(v) = overrides.fuse_operators {
        config.fuse_operators = v;
    }
    if let Some(v) = overrides.local_parallelism {
        config.local_parallelism = Some(v);
    }
    if let Some(v) = overrides.stats_refresh_ms {
        config.stats_refresh_ms = v;
    }
}

#[derive(Debug, Clone)]
pub struct ParsedPipeline {
    /// Unconverted (`Convention::None`) plan, rooted at a `Root` node.
    pub plan: Arc<PlanNode>,
    pub config: PipelineConfig,
    pub containers: Vec<ContainerDef>,
}

impl ParsedPipeline {
    /// Catalog holding every declared container with its declared size.
    pub fn build_catalog(&self) -> Result<ContainerCatalog> {
        let catalog = ContainerCatalog::new();
        for def in &self.containers {
            match def.kind {
                ContainerKind::PartitionedMap => {
                    let partitions = def.partitions.unwrap_or(DEFAULT_PARTITION_COUNT);
                    if partitions == 0 {
                        return Err(DslError::Invalid(format!(
                            "container '{}' needs at least one partition",
                            def.name
                        )));
                    }
                    catalog.register(Arc::new(
                        PartitionedMap::new(&def.name, partitions).with_entries(def.entries),
                    ));
                }
                ContainerKind::ReplicatedMap => {
                    catalog.register(Arc::new(
                        ReplicatedMap::new(&def.name).with_entries(def.entries),
                    ));
                }
                other => {
                    return Err(DslError::Invalid(format!(
                        "container '{}' has kind {other}; only map containers can be scanned",
                        def.name
                    )))
                }
            }
        }
        Ok(catalog)
    }
}

fn parse_dtype(s: &str) -> Result<DataType> {
    Ok(match s {
        "Boolean" | "bool" => DataType::Boolean,
        "Int32" | "i32" => DataType::Int32,
        "Int64" | "i64" => DataType::Int64,
        "Float32" | "f32" => DataType::Float32,
        "Float64" | "f64" => DataType::Float64,
        "Utf8" | "String" | "string" => DataType::Utf8,
        "Binary" | "bytes" => DataType::Binary,
        other => return Err(DslError::Invalid(format!("unknown column type '{other}'"))),
    })
}

fn to_schema(fields: &[FieldDef]) -> Result<Schema> {
    let fields = fields
        .iter()
        .map(|f| Ok(Field::new(&f.name, parse_dtype(&f.data_type)?, f.nullable)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Schema::new(fields))
}

fn project(input: Arc<PlanNode>, columns: &[String]) -> Result<Arc<PlanNode>> {
    let schema = input.row_type()?;
    let mut exprs = Vec::with_capacity(columns.len());
    let mut fields = Vec::with_capacity(columns.len());
    for (i, text) in columns.iter().enumerate() {
        let (expr, alias) = parse_projection_item(text, &schema)?;
        let name = match (alias, &expr) {
            (Some(alias), _) => alias,
            (None, Expr::Column(idx)) => schema
                .field(*idx)
                .map(|f| f.name.clone())
                .unwrap_or_else(|| format!("EXPR${i}")),
            (None, _) => format!("EXPR${i}"),
        };
        fields.push(Field::new(
            name,
            expr.data_type(&schema)?,
            expr.nullable(&schema),
        ));
        exprs.push(expr);
    }
    Ok(PlanNode::project(input, exprs, Schema::new(fields)))
}

/// Parse YAML into an unconverted plan plus its settings.
pub fn parse_yaml_pipeline(yaml_src: &str) -> Result<ParsedPipeline> {
    let doc: Pipeline = serde_yaml::from_str(yaml_src)?;
    let step_count = doc.steps.len();
    let mut cur: Option<Arc<PlanNode>> = None;

    for (i, step) in doc.steps.into_iter().enumerate() {
        cur = Some(match (step, cur) {
            (Step::Scan { source, schema }, None) => PlanNode::scan(source, to_schema(&schema)?),
            (Step::Scan { .. }, Some(_)) => {
                return Err(DslError::Invalid(
                    "scan must be the first and only source step".into(),
                ))
            }
            (_, None) => {
                return Err(DslError::Invalid("pipeline must start with a scan".into()));
            }
            (Step::Filter { expr }, Some(input)) => {
                let predicate = parse_expr(&expr, &input.row_type()?)?;
                PlanNode::filter(input, predicate)
            }
            (Step::Project { columns }, Some(input)) => project(input, &columns)?,
            (Step::Root, Some(input)) => {
                if i + 1 != step_count {
                    return Err(DslError::Invalid("root must be the last step".into()));
                }
                PlanNode::root(input)
            }
        });
    }

    let plan = match cur {
        Some(node) if matches!(node.op, Operator::Root) => node,
        Some(node) => PlanNode::root(node),
        None => return Err(DslError::Invalid("pipeline has no steps".into())),
    };

    Ok(ParsedPipeline {
        plan,
        config: doc.config.unwrap_or_default(),
        containers: doc.containers,
    })
}
