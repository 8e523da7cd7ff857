//! DAG compiler: shape, routing, fusion, and serialization

mod test_data_gen;

use relplan_core::config::PlannerConfig;
use relplan_core::expr::Expr;
use relplan_core::plan::{Convention, Distribution, PlanNode};
use relplan_core::schema::{DataType, Field, Schema};
use relplan_core::types::Scalar;
use relplan_dag::{assert_topological, assert_tree_shaped, compile_dag, ProcessorSpec, Routing};
use relplan_planner::default_rules;
use std::sync::Arc;
use test_data_gen::{amount_over_100, orders_pipeline, orders_schema};

fn physical(plan: &Arc<PlanNode>) -> Arc<PlanNode> {
    default_rules().convert(plan, Convention::Physical).unwrap()
}

#[test]
fn test_scan_filter_project_compiles_to_chain() {
    let root = physical(&orders_pipeline());
    // drop the root to look at the bare operator chain
    let project = root.input().unwrap();
    let dag = compile_dag(project, &PlannerConfig::default()).unwrap();

    assert_eq!(dag.vertices().len(), 3);
    assert_eq!(dag.edges().len(), 2);
    assert_topological(&dag);
    assert_tree_shaped(&dag);

    let kinds: Vec<&str> = dag.vertices().iter().map(|v| v.processor.kind_name()).collect();
    assert_eq!(kinds, vec!["scan", "filter", "project"]);
    assert_eq!(dag.sources().len(), 1);
    assert_eq!(dag.sinks()[0].name, "project");
}

#[test]
fn test_root_edge_gathers() {
    let dag = compile_dag(&physical(&orders_pipeline()), &PlannerConfig::default()).unwrap();
    assert_tree_shaped(&dag);
    let routings: Vec<Routing> = dag.edges().iter().map(|e| e.routing).collect();
    assert_eq!(
        routings,
        vec![Routing::Local, Routing::Local, Routing::AllToOne]
    );
    let sink = dag.sinks()[0];
    assert_eq!(sink.distribution, Distribution::Root);
    assert_eq!(sink.schema.len(), 2);
}

#[test]
fn test_scan_then_root_only() {
    let plan = PlanNode::root(PlanNode::scan("orders", orders_schema()));
    let dag = compile_dag(&physical(&plan), &PlannerConfig::default()).unwrap();
    assert_eq!(dag.vertices().len(), 2);
    assert_eq!(dag.edges()[0].routing, Routing::AllToOne);
}

#[test]
fn test_fused_vertex_filters_and_projects() {
    let config = PlannerConfig {
        fuse_operators: true,
        ..PlannerConfig::default()
    };
    let dag = compile_dag(&physical(&orders_pipeline()), &config).unwrap();
    assert_topological(&dag);
    assert_tree_shaped(&dag);
    assert_eq!(dag.vertices().len(), 3);

    let calc = &dag.vertices()[1].processor;
    assert_eq!(calc.kind_name(), "calc");
    let row = vec![Scalar::I64(1), Scalar::F64(150.0), Scalar::Str("emea".into())];
    assert_eq!(
        calc.process(row).unwrap(),
        Some(vec![Scalar::I64(1), Scalar::F64(300.0)])
    );
    let low = vec![Scalar::I64(2), Scalar::F64(5.0), Scalar::Str("apac".into())];
    assert_eq!(calc.process(low).unwrap(), None);
}

#[test]
fn test_fusion_needs_a_filter_below() {
    let config = PlannerConfig {
        fuse_operators: true,
        ..PlannerConfig::default()
    };
    let scan = PlanNode::scan("orders", orders_schema());
    let project = PlanNode::project(
        scan,
        vec![Expr::column(0)],
        Schema::new(vec![Field::new("id", DataType::Int64, false)]),
    );
    let dag = compile_dag(&physical(&project), &config).unwrap();
    let kinds: Vec<&str> = dag.vertices().iter().map(|v| v.processor.kind_name()).collect();
    assert_eq!(kinds, vec!["scan", "project"]);
}

#[test]
fn test_logical_plan_rejected() {
    let logical_scan = default_rules()
        .convert(&PlanNode::scan("orders", orders_schema()), Convention::Logical)
        .unwrap();
    let filter = default_rules()
        .convert(&PlanNode::filter(logical_scan, amount_over_100()), Convention::Logical)
        .unwrap();
    let err = compile_dag(&filter, &PlannerConfig::default()).unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn test_json_and_fingerprint_are_stable() {
    let plan = physical(&orders_pipeline());
    let a = compile_dag(&plan, &PlannerConfig::default()).unwrap();
    let b = compile_dag(&plan, &PlannerConfig::default()).unwrap();
    assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

    let json: serde_json::Value = serde_json::from_str(&a.to_json().unwrap()).unwrap();
    assert_eq!(json["vertices"].as_array().unwrap().len(), 4);
    assert_eq!(json["edges"][2]["routing"], "all_to_one");
    assert!(matches!(a.vertices()[0].processor, ProcessorSpec::Scan { .. }));
}
