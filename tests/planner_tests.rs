//! Rule set, optimizer, and explain over the default registry

mod test_data_gen;

use relplan_core::config::PlannerConfig;
use relplan_core::plan::{Convention, Distribution, OpKind, PlanNode};
use relplan_planner::{default_rules, explain, MetadataQuery, Optimizer};
use test_data_gen::{catalog_with, metadata, orders_pipeline, orders_schema};

fn walk(node: &PlanNode, out: &mut Vec<(OpKind, Convention, Distribution)>) {
    out.push((node.kind(), node.convention(), node.traits.distribution));
    for input in &node.inputs {
        walk(input, out);
    }
}

#[test]
fn test_default_registry_covers_every_operator() {
    let rules = default_rules();
    assert_eq!(rules.len(), 8);
    for kind in [OpKind::Scan, OpKind::Filter, OpKind::Project, OpKind::Root] {
        assert_eq!(
            rules.rules_for(kind, Convention::None, Convention::Logical).len(),
            1
        );
        assert_eq!(
            rules
                .rules_for(kind, Convention::Logical, Convention::Physical)
                .len(),
            1
        );
    }
}

#[test]
fn test_convert_none_to_physical_sets_traits() {
    let physical = default_rules()
        .convert(&orders_pipeline(), Convention::Physical)
        .unwrap();
    let mut nodes = Vec::new();
    walk(&physical, &mut nodes);
    assert_eq!(
        nodes,
        vec![
            (OpKind::Root, Convention::Physical, Distribution::Root),
            (OpKind::Project, Convention::Physical, Distribution::Partitioned),
            (OpKind::Filter, Convention::Physical, Distribution::Partitioned),
            (OpKind::Scan, Convention::Physical, Distribution::Partitioned),
        ]
    );
}

#[test]
fn test_logical_conversion_keeps_distribution_any() {
    let logical = default_rules()
        .convert(&orders_pipeline(), Convention::Logical)
        .unwrap();
    let mut nodes = Vec::new();
    walk(&logical, &mut nodes);
    assert!(nodes
        .iter()
        .all(|(_, c, d)| *c == Convention::Logical && *d == Distribution::Any));
}

#[test]
fn test_optimizer_returns_physical_plan_and_cost() {
    let mq = metadata(catalog_with("orders", 5000), PlannerConfig::default());
    let optimizer = Optimizer::new(default_rules(), &mq);
    let optimized = optimizer.optimize(&orders_pipeline()).unwrap();

    assert_eq!(optimized.logical.convention(), Convention::Logical);
    assert!(optimized.physical.is_physical());
    assert_eq!(optimized.physical.node_count(), 4);

    // scan 5000, filter keeps half, project and root pass 2500 through
    assert_eq!(optimized.cost.rows, 5000.0 + 2500.0 * 3.0);
    assert_eq!(optimized.cost.cpu, 5000.0 + 5000.0 + 5000.0 + 2500.0);
    assert_eq!(optimized.cost.io, 5000.0);
    assert_eq!(mq.row_count(&optimized.physical).unwrap(), 2500.0);
}

#[test]
fn test_optimizer_rejects_invalid_config() {
    let config = PlannerConfig {
        default_selectivity: 1.5,
        ..PlannerConfig::default()
    };
    let mq = metadata(catalog_with("orders", 10), config);
    let optimizer = Optimizer::new(default_rules(), &mq);
    assert!(optimizer.optimize(&orders_pipeline()).is_err());
}

#[test]
fn test_explain_shows_conditions_and_costs() {
    let config = PlannerConfig::default();
    let mq = metadata(catalog_with("orders", 5000), config.clone());
    let optimized = Optimizer::new(default_rules(), &mq)
        .optimize(&orders_pipeline())
        .unwrap();

    let logical = explain(&optimized.logical, None).unwrap();
    assert_eq!(
        logical,
        "RootLogical\n  \
         ProjectLogical(id=$0, doubled=($1 * 2))\n    \
         FilterLogical(condition=$1 > 100)\n      \
         ScanLogical(table=orders)\n"
    );

    let costing: &dyn MetadataQuery = &mq;
    let physical = explain(&optimized.physical, Some(costing)).unwrap();
    let lines: Vec<&str> = physical.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "RootPhysical(distribution=ROOT): {2500 rows, 2500 cpu, 0 io}"
    );
    assert_eq!(
        lines[3].trim_start(),
        "ScanPhysical(table=orders, distribution=PARTITIONED): {5000 rows, 5000 cpu, 5000 io}"
    );
}

#[test]
fn test_costed_explain_of_logical_plan_fails() {
    let config = PlannerConfig::default();
    let mq = metadata(catalog_with("orders", 5), config.clone());
    let logical = default_rules()
        .convert(&PlanNode::scan("orders", orders_schema()), Convention::Logical)
        .unwrap();
    let costing: &dyn MetadataQuery = &mq;
    let err = explain(&logical, Some(costing)).unwrap_err();
    assert!(err.is_contract_violation());
}
