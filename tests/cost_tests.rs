//! Cost model properties: filter estimate bounds and per-operator formulas

mod test_data_gen;

use relplan_core::config::{CostOrdering, PlannerConfig};
use relplan_core::expr::Expr;
use relplan_core::plan::{Convention, PlanNode};
use relplan_core::schema::{DataType, Field, Schema};
use relplan_core::types::Scalar;
use relplan_planner::{
    adjust_filtered_row_count, compute_self_cost, default_rules, Cost, MetadataQuery,
};
use test_data_gen::{catalog_with, metadata, orders_pipeline, orders_schema};

#[test]
fn test_filter_estimate_is_monotone_and_bounded() {
    let config = PlannerConfig::default();
    for rows in [0.0, 0.5, 1.0, 3.0, 1_000.0, 1e9] {
        let mut previous = 0.0;
        for step in 0..=20 {
            let s = step as f64 / 20.0;
            let out = adjust_filtered_row_count(rows, Some(s), &config);
            assert!(out <= rows, "rows={rows} s={s} out={out}");
            assert!(out >= previous, "not monotone at rows={rows} s={s}");
            if rows > 0.0 {
                assert!(out > 0.0, "non-empty input estimated empty at s={s}");
            }
            previous = out;
        }
    }
}

#[test]
fn test_filter_floor_and_degenerate_inputs() {
    let config = PlannerConfig {
        min_filtered_rows: 10.0,
        default_selectivity: 0.25,
        ..PlannerConfig::default()
    };
    assert_eq!(adjust_filtered_row_count(1000.0, Some(0.0), &config), 10.0);
    assert_eq!(adjust_filtered_row_count(4.0, Some(0.0), &config), 4.0);
    assert_eq!(adjust_filtered_row_count(1000.0, None, &config), 250.0);
    assert_eq!(adjust_filtered_row_count(1000.0, Some(f64::NAN), &config), 250.0);
    assert_eq!(adjust_filtered_row_count(1000.0, Some(7.0), &config), 1000.0);
    assert_eq!(adjust_filtered_row_count(1000.0, Some(-1.0), &config), 10.0);
    assert_eq!(adjust_filtered_row_count(f64::NAN, Some(0.5), &config), 0.0);
    assert_eq!(adjust_filtered_row_count(-5.0, Some(0.5), &config), 0.0);
}

#[test]
fn test_self_costs_per_operator() {
    let config = PlannerConfig::default();
    let mq = metadata(catalog_with("orders", 800), config.clone());
    let root = default_rules()
        .convert(&orders_pipeline(), Convention::Physical)
        .unwrap();
    let project = root.input().unwrap();
    let filter = project.input().unwrap();
    let scan = filter.input().unwrap();

    assert_eq!(
        compute_self_cost(scan, &mq).unwrap(),
        Cost::new(800.0, 800.0, 800.0)
    );
    // filter CPU is one unit per input row, regardless of selectivity
    assert_eq!(
        compute_self_cost(filter, &mq).unwrap(),
        Cost::new(400.0, 800.0, 0.0)
    );
    // project keeps its input rows; two expressions
    assert_eq!(
        compute_self_cost(project, &mq).unwrap(),
        Cost::new(400.0, 800.0, 0.0)
    );
    assert_eq!(
        compute_self_cost(&root, &mq).unwrap(),
        Cost::new(400.0, 400.0, 0.0)
    );
}

#[test]
fn test_filter_floor_agrees_between_self_cost_and_parent_input() {
    let config = PlannerConfig {
        min_filtered_rows: 100.0,
        ..PlannerConfig::default()
    };
    let mq = metadata(catalog_with("orders", 5000), config);
    let plan = PlanNode::root(PlanNode::project(
        PlanNode::filter(
            PlanNode::scan("orders", orders_schema()),
            Expr::literal(Scalar::Bool(false)),
        ),
        vec![Expr::column(0)],
        Schema::new(vec![Field::new("id", DataType::Int64, false)]),
    ));
    let root = default_rules().convert(&plan, Convention::Physical).unwrap();
    let project = root.input().unwrap();
    let filter = project.input().unwrap();

    let filter_cost = compute_self_cost(filter, &mq).unwrap();
    assert_eq!(filter_cost, Cost::new(100.0, 5000.0, 0.0));
    assert_eq!(mq.row_count(filter).unwrap(), filter_cost.rows);
    assert_eq!(compute_self_cost(project, &mq).unwrap().rows, filter_cost.rows);
    assert_eq!(compute_self_cost(&root, &mq).unwrap().rows, filter_cost.rows);
}

#[test]
fn test_unknown_container_uses_default_rows() {
    let config = PlannerConfig::default();
    let mq = metadata(catalog_with("other", 3), config.clone());
    let root = default_rules()
        .convert(&orders_pipeline(), Convention::Physical)
        .unwrap();
    let scan = root.input().unwrap().input().unwrap().input().unwrap();
    let cost = compute_self_cost(scan, &mq).unwrap();
    assert_eq!(cost.rows, 1000.0);
}

#[test]
fn test_orderings_disagree_on_tradeoffs() {
    let few_rows = Cost::new(10.0, 500.0, 0.0);
    let cheap_cpu = Cost::new(100.0, 50.0, 0.0);
    assert!(few_rows.is_lt(&cheap_cpu, CostOrdering::RowsThenCpu));
    assert!(cheap_cpu.is_lt(&few_rows, CostOrdering::CpuThenRows));
    assert!(cheap_cpu.is_lt(&few_rows, CostOrdering::Total));

    let io_heavy = Cost::new(1.0, 0.0, 10.0);
    let cpu_heavy = Cost::new(1.0, 99.0, 0.0);
    assert!(cpu_heavy.is_lt(&io_heavy, CostOrdering::Total));
}

#[test]
fn test_cost_components_are_sanitized() {
    let c = Cost::new(f64::NAN, -3.0, 2.0);
    assert_eq!(c, Cost::new(0.0, 0.0, 2.0));
    assert_eq!(c.plus(&Cost::zero()), c);
}
