use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use relplan_core::config::PlannerConfig;
use relplan_core::expr::{ArithOp, CompareOp, Expr};
use relplan_core::plan::PlanNode;
use relplan_core::schema::{DataType, Field, Schema};
use relplan_core::types::Scalar;
use relplan_dag::compile_dag;
use relplan_planner::{default_rules, parse_yaml_pipeline, Optimizer, StatsMetadataQuery};
use relplan_stats::{ContainerCatalog, DefaultStatisticProvider, PartitionedMap};

/// scan → `depth` alternating filter/project pairs → root
fn make_plan(depth: usize) -> Arc<PlanNode> {
    let schema = Schema::new(vec![
        Field::new("k", DataType::Int64, false),
        Field::new("v", DataType::Float64, true),
    ]);
    let mut node = PlanNode::scan("events", schema.clone());
    for i in 0..depth {
        node = PlanNode::filter(
            node,
            Expr::compare(
                CompareOp::Gt,
                Expr::column(1),
                Expr::literal(Scalar::I64(i as i64)),
            ),
        );
        node = PlanNode::project(
            node,
            vec![
                Expr::column(0),
                Expr::arithmetic(ArithOp::Add, Expr::column(1), Expr::literal(Scalar::F64(1.0))),
            ],
            schema.clone(),
        );
    }
    PlanNode::root(node)
}

fn bench_optimize_and_compile(c: &mut Criterion) {
    let catalog = ContainerCatalog::new();
    catalog.register(Arc::new(
        PartitionedMap::new("events", 271).with_entries(1_000_000),
    ));
    let config = PlannerConfig {
        fuse_operators: true,
        ..PlannerConfig::default()
    };
    let mq = StatsMetadataQuery::new(
        Arc::new(catalog),
        Arc::new(DefaultStatisticProvider),
        config.clone(),
    );
    let plan = make_plan(16);

    c.bench_function("optimize_depth_16", |b| {
        b.iter(|| {
            let _ = Optimizer::new(default_rules(), &mq)
                .optimize(&plan)
                .unwrap();
        })
    });

    let physical = Optimizer::new(default_rules(), &mq)
        .optimize(&plan)
        .unwrap()
        .physical;
    c.bench_function("compile_dag_depth_16", |b| {
        b.iter(|| {
            let _ = compile_dag(&physical, &config).unwrap();
        })
    });
}

fn bench_yaml_parse(c: &mut Criterion) {
    let yaml = r#"
steps:
  - op: scan
    source: events
    schema:
      - { name: k, type: Int64 }
      - { name: v, type: Float64, nullable: true }
  - op: filter
    expr: "v > 10 AND (k = 3 OR k <> 7) AND v IS NOT NULL"
  - op: project
    columns: ["k", "v * 2 + 1 AS w"]
"#;
    c.bench_function("parse_yaml_pipeline", |b| {
        b.iter(|| {
            let _ = parse_yaml_pipeline(yaml).unwrap();
        })
    });
}

criterion_group!(planning, bench_optimize_and_compile, bench_yaml_parse);
criterion_main!(planning);
