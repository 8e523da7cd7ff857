//! NONE → LOGICAL conversion rules.
//!
//! Each rule converts its inputs first, then rebuilds the node with the same
//! payload (predicate, expressions, declared row type) under the logical
//! convention. Distribution is left as `Any`; placement is decided later.

use relplan_core::error::Result;
use relplan_core::plan::{Convention, OpKind, Operator, PlanNode};

use crate::rules::{ConverterRule, RuleRegistry};

pub const SCAN_LOGICAL_RULE: ConverterRule = ConverterRule::new(
    "ScanLogicalRule",
    OpKind::Scan,
    Convention::None,
    Convention::Logical,
    convert_scan,
);

pub const FILTER_LOGICAL_RULE: ConverterRule = ConverterRule::new(
    "FilterLogicalRule",
    OpKind::Filter,
    Convention::None,
    Convention::Logical,
    convert_filter,
);

pub const PROJECT_LOGICAL_RULE: ConverterRule = ConverterRule::new(
    "ProjectLogicalRule",
    OpKind::Project,
    Convention::None,
    Convention::Logical,
    convert_project,
);

pub const ROOT_LOGICAL_RULE: ConverterRule = ConverterRule::new(
    "RootLogicalRule",
    OpKind::Root,
    Convention::None,
    Convention::Logical,
    convert_root,
);

pub(crate) const RULES: [ConverterRule; 4] = [
    SCAN_LOGICAL_RULE,
    FILTER_LOGICAL_RULE,
    PROJECT_LOGICAL_RULE,
    ROOT_LOGICAL_RULE,
];

fn convert_scan(rule: &ConverterRule, node: &PlanNode, _: &RuleRegistry) -> Result<PlanNode> {
    let Operator::Scan(scan) = &node.op else {
        return Err(rule.mismatch(node));
    };
    PlanNode::try_new(
        node.traits.with_convention(rule.to),
        Operator::Scan(scan.clone()),
        vec![],
    )
}

fn convert_filter(rule: &ConverterRule, node: &PlanNode, registry: &RuleRegistry) -> Result<PlanNode> {
    let Operator::Filter(filter) = &node.op else {
        return Err(rule.mismatch(node));
    };
    PlanNode::try_new(
        node.traits.with_convention(rule.to),
        Operator::Filter(filter.clone()),
        registry.convert_inputs(node, rule.to)?,
    )
}

fn convert_project(rule: &ConverterRule, node: &PlanNode, registry: &RuleRegistry) -> Result<PlanNode> {
    let Operator::Project(project) = &node.op else {
        return Err(rule.mismatch(node));
    };
    PlanNode::try_new(
        node.traits.with_convention(rule.to),
        Operator::Project(project.clone()),
        registry.convert_inputs(node, rule.to)?,
    )
}

fn convert_root(rule: &ConverterRule, node: &PlanNode, registry: &RuleRegistry) -> Result<PlanNode> {
    if !matches!(node.op, Operator::Root) {
        return Err(rule.mismatch(node));
    }
    PlanNode::try_new(
        node.traits.with_convention(rule.to),
        Operator::Root,
        registry.convert_inputs(node, rule.to)?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default_rules;
    use relplan_core::error::Error;
    use relplan_core::expr::{CompareOp, Expr};
    use relplan_core::schema::{DataType, Field, Schema};
    use relplan_core::types::Scalar;
    use std::sync::Arc;

    fn scan() -> Arc<PlanNode> {
        PlanNode::scan(
            "orders",
            Schema::new(vec![
                Field::new("id", DataType::Int64, false),
                Field::new("amount", DataType::Float64, true),
            ]),
        )
    }

    #[test]
    fn filter_keeps_predicate_and_converts_input() {
        let predicate = Expr::compare(
            CompareOp::Gt,
            Expr::column(1),
            Expr::literal(Scalar::F64(10.0)),
        );
        let filter = PlanNode::filter(scan(), predicate.clone());
        let out = FILTER_LOGICAL_RULE.apply(&filter, default_rules()).unwrap();

        assert_eq!(out.convention(), Convention::Logical);
        assert_eq!(out.inputs[0].convention(), Convention::Logical);
        assert!(matches!(&out.op, Operator::Filter(f) if f.predicate == predicate));
        // the input tree is untouched
        assert_eq!(filter.convention(), Convention::None);
    }

    #[test]
    fn project_keeps_declared_row_type() {
        let row_type = Schema::new(vec![Field::new("renamed", DataType::Int64, false)]);
        let project = PlanNode::project(scan(), vec![Expr::column(0)], row_type.clone());
        let out = PROJECT_LOGICAL_RULE.apply(&project, default_rules()).unwrap();
        assert_eq!(out.row_type().unwrap(), row_type);
    }

    #[test]
    fn project_rule_rejects_filter() {
        let filter = PlanNode::filter(scan(), Expr::literal(Scalar::Bool(true)));
        let err = PROJECT_LOGICAL_RULE.apply(&filter, default_rules()).unwrap_err();
        assert!(matches!(err, Error::RuleMismatch { kind: OpKind::Filter, .. }));
    }
}
