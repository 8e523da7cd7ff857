//! Shared fixtures for the workspace integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use relplan_core::config::PlannerConfig;
use relplan_core::expr::{ArithOp, CompareOp, Expr};
use relplan_core::plan::PlanNode;
use relplan_core::schema::{DataType, Field, Schema};
use relplan_core::types::Scalar;
use relplan_planner::StatsMetadataQuery;
use relplan_stats::{ContainerCatalog, DefaultStatisticProvider, PartitionedMap};

/// `orders(id BIGINT, amount DOUBLE NULL, region VARCHAR)`
pub fn orders_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("amount", DataType::Float64, true),
        Field::new("region", DataType::Utf8, false),
    ])
}

/// `amount > 100`
pub fn amount_over_100() -> Expr {
    Expr::compare(
        CompareOp::Gt,
        Expr::column(1),
        Expr::literal(Scalar::I32(100)),
    )
}

/// scan(orders) → filter(amount > 100) → project(id, amount * 2) → root
pub fn orders_pipeline() -> Arc<PlanNode> {
    let scan = PlanNode::scan("orders", orders_schema());
    let filter = PlanNode::filter(scan, amount_over_100());
    let project = PlanNode::project(
        filter,
        vec![
            Expr::column(0),
            Expr::arithmetic(ArithOp::Mul, Expr::column(1), Expr::literal(Scalar::I32(2))),
        ],
        Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("doubled", DataType::Float64, true),
        ]),
    );
    PlanNode::root(project)
}

/// Catalog with a single partitioned map named `name` holding `rows` entries.
pub fn catalog_with(name: &str, rows: u64) -> Arc<ContainerCatalog> {
    let catalog = ContainerCatalog::new();
    catalog.register(Arc::new(PartitionedMap::new(name, 8).with_entries(rows)));
    Arc::new(catalog)
}

pub fn metadata(catalog: Arc<ContainerCatalog>, config: PlannerConfig) -> StatsMetadataQuery {
    StatsMetadataQuery::new(catalog, Arc::new(DefaultStatisticProvider), config)
}

pub const ORDERS_YAML: &str = r#"
config:
  cost_ordering: rows_then_cpu
containers:
  - { name: orders, kind: partitioned_map, partitions: 16, entries: 5000 }
steps:
  - op: scan
    source: orders
    schema:
      - { name: id, type: Int64, nullable: false }
      - { name: amount, type: Float64, nullable: true }
      - { name: region, type: Utf8, nullable: false }
  - op: filter
    expr: "amount > 100 AND region = 'emea'"
  - op: project
    columns: ["id", "amount * 2 AS doubled"]
"#;
