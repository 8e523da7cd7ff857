//! LOGICAL → PHYSICAL rules and the behavior physical operators expose:
//! schema derivation and visitor-style graph compilation.
//!
//! Physical nodes also carry a placement. Scans read partitioned data in
//! place, the root gathers everything onto one member, and filter/project
//! inherit whatever their input produced.

use std::sync::Arc;

use relplan_core::error::{Error, Result};
use relplan_core::expr::Expr;
use relplan_core::plan::{
    Convention, Distribution, FilterOp, OpKind, Operator, PlanNode, ProjectOp, ScanOp, TraitSet,
};
use relplan_core::schema::{DataType, Field, Schema};

use crate::rules::{ConverterRule, RuleRegistry};

pub const SCAN_PHYSICAL_RULE: ConverterRule = ConverterRule::new(
    "ScanPhysicalRule",
    OpKind::Scan,
    Convention::Logical,
    Convention::Physical,
    convert_scan,
);

pub const FILTER_PHYSICAL_RULE: ConverterRule = ConverterRule::new(
    "FilterPhysicalRule",
    OpKind::Filter,
    Convention::Logical,
    Convention::Physical,
    convert_filter,
);

pub const PROJECT_PHYSICAL_RULE: ConverterRule = ConverterRule::new(
    "ProjectPhysicalRule",
    OpKind::Project,
    Convention::Logical,
    Convention::Physical,
    convert_project,
);

pub const ROOT_PHYSICAL_RULE: ConverterRule = ConverterRule::new(
    "RootPhysicalRule",
    OpKind::Root,
    Convention::Logical,
    Convention::Physical,
    convert_root,
);

pub(crate) const RULES: [ConverterRule; 4] = [
    SCAN_PHYSICAL_RULE,
    FILTER_PHYSICAL_RULE,
    PROJECT_PHYSICAL_RULE,
    ROOT_PHYSICAL_RULE,
];

fn convert_scan(rule: &ConverterRule, node: &PlanNode, _: &RuleRegistry) -> Result<PlanNode> {
    let Operator::Scan(scan) = &node.op else {
        return Err(rule.mismatch(node));
    };
    let traits = node
        .traits
        .with_convention(rule.to)
        .with_distribution(Distribution::Partitioned);
    PlanNode::try_new(traits, Operator::Scan(scan.clone()), vec![])
}

fn convert_filter(rule: &ConverterRule, node: &PlanNode, registry: &RuleRegistry) -> Result<PlanNode> {
    let Operator::Filter(filter) = &node.op else {
        return Err(rule.mismatch(node));
    };
    let inputs = registry.convert_inputs(node, rule.to)?;
    let traits = inherit_distribution(node, rule, &inputs);
    PlanNode::try_new(traits, Operator::Filter(filter.clone()), inputs)
}

fn convert_project(rule: &ConverterRule, node: &PlanNode, registry: &RuleRegistry) -> Result<PlanNode> {
    let Operator::Project(project) = &node.op else {
        return Err(rule.mismatch(node));
    };
    let inputs = registry.convert_inputs(node, rule.to)?;
    let traits = inherit_distribution(node, rule, &inputs);
    PlanNode::try_new(traits, Operator::Project(project.clone()), inputs)
}

fn convert_root(rule: &ConverterRule, node: &PlanNode, registry: &RuleRegistry) -> Result<PlanNode> {
    if !matches!(node.op, Operator::Root) {
        return Err(rule.mismatch(node));
    }
    let traits = node
        .traits
        .with_convention(rule.to)
        .with_distribution(Distribution::Root);
    PlanNode::try_new(traits, Operator::Root, registry.convert_inputs(node, rule.to)?)
}

fn inherit_distribution(
    node: &PlanNode,
    rule: &ConverterRule,
    inputs: &[Arc<PlanNode>],
) -> TraitSet {
    let distribution = inputs
        .first()
        .map(|input| input.traits.distribution)
        .unwrap_or(Distribution::Any);
    node.traits
        .with_convention(rule.to)
        .with_distribution(distribution)
}

fn require_physical(node: &PlanNode) -> Result<()> {
    if node.is_physical() {
        Ok(())
    } else {
        Err(Error::NotPhysical {
            kind: node.kind(),
            convention: node.convention(),
        })
    }
}

/// Output schema of a physical node, derived on every call.
///
/// Filter and root pass their input through. Project recomputes types and
/// nullability from its expressions over the input schema, keeping the
/// declared column names (or `EXPR$i` where none was declared).
pub fn schema(node: &PlanNode) -> Result<Schema> {
    require_physical(node)?;
    match &node.op {
        Operator::Scan(scan) => Ok(scan.schema.clone()),
        Operator::Filter(_) | Operator::Root => schema(node.input()?),
        Operator::Project(project) => {
            let input = schema(node.input()?)?;
            project_schema(project, &input)
        }
    }
}

pub(crate) fn project_schema(project: &ProjectOp, input: &Schema) -> Result<Schema> {
    let fields = project
        .exprs
        .iter()
        .enumerate()
        .map(|(i, expr)| {
            let name = project
                .row_type
                .field(i)
                .map(|f| f.name.clone())
                .unwrap_or_else(|| format!("EXPR${i}"));
            Ok(Field::new(name, expr.data_type(input)?, expr.nullable(input)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Schema::new(fields))
}

/// Predicate of a physical filter, checked against the input schema.
pub fn filter_predicate<'a>(filter: &'a FilterOp, input: &Schema) -> Result<&'a Expr> {
    let ty = filter.predicate.data_type(input)?;
    if ty != DataType::Boolean && ty != DataType::Null {
        return Err(Error::Schema(format!(
            "filter predicate {} has type {ty}, expected BOOLEAN",
            filter.predicate
        )));
    }
    Ok(&filter.predicate)
}

/// Expressions of a physical project, checked against the input schema.
pub fn projection<'a>(project: &'a ProjectOp, input: &Schema) -> Result<&'a [Expr]> {
    for expr in &project.exprs {
        expr.data_type(input)?;
    }
    Ok(&project.exprs)
}

/// Graph-building callbacks, one per physical operator kind. `accept`
/// dispatches a node to exactly one of them; child outputs are passed in
/// input order and were produced by earlier calls on the same visitor.
pub trait CreateDagVisitor {
    type Output;

    fn on_scan(&mut self, node: &PlanNode, scan: &ScanOp) -> Result<Self::Output>;
    fn on_filter(
        &mut self,
        node: &PlanNode,
        filter: &FilterOp,
        input: Self::Output,
    ) -> Result<Self::Output>;
    fn on_project(
        &mut self,
        node: &PlanNode,
        project: &ProjectOp,
        input: Self::Output,
    ) -> Result<Self::Output>;
    fn on_root(&mut self, node: &PlanNode, input: Self::Output) -> Result<Self::Output>;
}

/// Compile `node` and its subtree children-first. Each node is visited once.
pub fn accept<V: CreateDagVisitor>(node: &PlanNode, visitor: &mut V) -> Result<V::Output> {
    require_physical(node)?;
    match &node.op {
        Operator::Scan(scan) => visitor.on_scan(node, scan),
        Operator::Filter(filter) => {
            let input = accept(node.input()?, visitor)?;
            visitor.on_filter(node, filter, input)
        }
        Operator::Project(project) => {
            let input = accept(node.input()?, visitor)?;
            visitor.on_project(node, project, input)
        }
        Operator::Root => {
            let input = accept(node.input()?, visitor)?;
            visitor.on_root(node, input)
        }
    }
}
