//! Bottom-up driver: logical conversion, then the cheapest physical
//! alternative per node.
//!
//! Every registered LOGICAL → PHYSICAL rule for a node's kind is tried over
//! the already-chosen physical inputs, and the candidate with the lowest
//! cumulative cost under the configured ordering wins. Ties keep the rule
//! registered first.

use std::sync::Arc;

use relplan_core::config::{CostOrdering, PlannerConfig};
use relplan_core::error::{Error, Result};
use relplan_core::hash::{hash_serde, Hash256};
use relplan_core::plan::{validate_conventions, Convention, PlanNode};
use relplan_core::trace::emit_event;

use crate::cost::{cumulative_cost, Cost};
use crate::metadata::MetadataQuery;
use crate::rules::RuleRegistry;

#[derive(Debug, Clone)]
pub struct OptimizedPlan {
    pub logical: Arc<PlanNode>,
    pub physical: Arc<PlanNode>,
    pub cost: Cost,
}

/// Costs and ranks candidates with the metadata query's config, the same
/// settings its row estimates are computed under.
pub struct Optimizer<'a> {
    registry: &'a RuleRegistry,
    mq: &'a dyn MetadataQuery,
}

impl<'a> Optimizer<'a> {
    pub fn new(registry: &'a RuleRegistry, mq: &'a dyn MetadataQuery) -> Self {
        Self { registry, mq }
    }

    pub fn config(&self) -> &PlannerConfig {
        self.mq.config()
    }

    pub fn optimize(&self, plan: &Arc<PlanNode>) -> Result<OptimizedPlan> {
        self.config().validate()?;
        let logical = self.registry.convert(plan, Convention::Logical)?;
        let (physical, cost) = self.best_physical(&logical)?;
        validate_conventions(&physical)?;
        emit_event(
            "optimizer.done",
            &[
                ("nodes", physical.node_count().to_string()),
                ("cost", cost.to_string()),
            ],
        );
        Ok(OptimizedPlan {
            logical,
            physical,
            cost,
        })
    }

    fn best_physical(&self, node: &Arc<PlanNode>) -> Result<(Arc<PlanNode>, Cost)> {
        let inputs = node
            .inputs
            .iter()
            .map(|input| self.best_physical(input).map(|(best, _)| best))
            .collect::<Result<Vec<_>>>()?;
        // Logical node over physical inputs: rules share the inputs as-is.
        let staged = PlanNode::try_new(node.traits, node.op.clone(), inputs)?;

        let rules = self
            .registry
            .rules_for(node.kind(), Convention::Logical, Convention::Physical);
        let mut seen: Vec<Hash256> = Vec::with_capacity(rules.len());
        let mut candidates = Vec::with_capacity(rules.len());
        for rule in rules {
            let candidate = Arc::new(rule.apply(&staged, self.registry)?);
            let digest = hash_serde(candidate.as_ref())?;
            if seen.contains(&digest) {
                continue;
            }
            seen.push(digest);
            let cost = cumulative_cost(&candidate, self.mq)?;
            candidates.push((rule.name, candidate, cost));
        }

        let considered = candidates.len();
        let (rule, best, cost) = pick_cheapest(candidates, self.config().cost_ordering)
            .ok_or_else(|| {
                Error::Plan(format!(
                    "no rule converts {} from LOGICAL to PHYSICAL",
                    node.kind()
                ))
            })?;
        emit_event(
            "optimizer.choice",
            &[
                ("rule", rule.to_string()),
                ("candidates", considered.to_string()),
                ("cost", cost.to_string()),
            ],
        );
        Ok((best, cost))
    }
}

/// Lowest-cost entry; on ties the earliest one is kept.
pub(crate) fn pick_cheapest<T>(
    candidates: impl IntoIterator<Item = (&'static str, T, Cost)>,
    ordering: CostOrdering,
) -> Option<(&'static str, T, Cost)> {
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(current) if !candidate.2.is_lt(&current.2, ordering) => Some(current),
        _ => Some(candidate),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physical::FILTER_PHYSICAL_RULE;
    use crate::rules::ConverterRule;
    use relplan_core::expr::{CompareOp, Expr};
    use relplan_core::plan::{FilterOp, OpKind, Operator};
    use relplan_core::schema::{DataType, Field, Schema};
    use relplan_core::types::Scalar;

    struct Fixed(f64, PlannerConfig);

    fn fixed(rows: f64) -> Fixed {
        Fixed(rows, PlannerConfig::default())
    }

    impl MetadataQuery for Fixed {
        fn config(&self) -> &PlannerConfig {
            &self.1
        }
        fn scan_row_count(&self, _: &PlanNode) -> Result<f64> {
            Ok(self.0)
        }
        fn selectivity(&self, _: &PlanNode, predicate: &Expr) -> Option<f64> {
            if *predicate == Expr::literal(Scalar::Bool(false)) {
                Some(0.0)
            } else {
                Some(0.5)
            }
        }
    }

    fn plan() -> Arc<PlanNode> {
        let scan = PlanNode::scan(
            "t",
            Schema::new(vec![Field::new("a", DataType::Int32, false)]),
        );
        PlanNode::root(PlanNode::filter(
            scan,
            Expr::compare(CompareOp::Lt, Expr::column(0), Expr::literal(Scalar::I32(3))),
        ))
    }

    #[test]
    fn default_rules_produce_physical_plan() {
        let registry = RuleRegistry::with_default_rules();
        let mq = fixed(100.0);
        let out = Optimizer::new(&registry, &mq)
            .optimize(&plan())
            .unwrap();
        assert_eq!(out.logical.convention(), Convention::Logical);
        assert!(out.physical.is_physical());
        assert_eq!(out.physical.node_count(), 3);
        // scan 100/100/100 + filter 50/100/0 + root 50/50/0
        assert_eq!(out.cost, Cost::new(200.0, 250.0, 100.0));
    }

    fn always_false(rule: &ConverterRule, node: &PlanNode, registry: &RuleRegistry) -> Result<PlanNode> {
        if !matches!(node.op, Operator::Filter(_)) {
            return Err(rule.mismatch(node));
        }
        PlanNode::try_new(
            node.traits.with_convention(rule.to),
            Operator::Filter(FilterOp {
                predicate: Expr::literal(Scalar::Bool(false)),
            }),
            registry.convert_inputs(node, rule.to)?,
        )
    }

    #[test]
    fn cheaper_alternative_wins() {
        let mut registry = RuleRegistry::with_default_rules();
        registry.register(ConverterRule::new(
            "AlwaysFalseFilterRule",
            OpKind::Filter,
            Convention::Logical,
            Convention::Physical,
            always_false,
        ));
        let mq = fixed(100.0);
        let out = Optimizer::new(&registry, &mq)
            .optimize(&plan())
            .unwrap();
        let filter = out.physical.input().unwrap();
        assert!(matches!(
            &filter.op,
            Operator::Filter(f) if f.predicate == Expr::literal(Scalar::Bool(false))
        ));
    }

    #[test]
    fn duplicate_rule_is_harmless() {
        let mut registry = RuleRegistry::with_default_rules();
        registry.register(FILTER_PHYSICAL_RULE);
        let mq = fixed(10.0);
        let out = Optimizer::new(&registry, &mq)
            .optimize(&plan())
            .unwrap();
        assert!(out.physical.is_physical());
    }

    #[test]
    fn ties_keep_first_candidate() {
        let c = Cost::new(1.0, 1.0, 1.0);
        let picked = pick_cheapest(
            vec![("a", 1, c), ("b", 2, c), ("c", 3, Cost::new(2.0, 0.0, 0.0))],
            CostOrdering::RowsThenCpu,
        )
        .unwrap();
        assert_eq!(picked.0, "a");
        assert!(pick_cheapest(Vec::<(&'static str, u8, Cost)>::new(), CostOrdering::Total).is_none());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let registry = RuleRegistry::with_default_rules();
        let cfg = PlannerConfig {
            default_selectivity: 3.0,
            ..PlannerConfig::default()
        };
        let mq = Fixed(1.0, cfg);
        let err = Optimizer::new(&registry, &mq).optimize(&plan()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
