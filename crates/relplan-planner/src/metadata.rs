//! Metadata queries consulted by the cost model: row counts and predicate
//! selectivity. Estimates only; an unknown answer is `None` or a default,
//! never an error, except for containers the oracle cannot size at all.
//!
//! A metadata query carries the planner config used for every estimate it
//! hands out, so a node's row count is the same number whether the cost
//! model or a parent asks for it.

use std::sync::Arc;

use relplan_core::config::PlannerConfig;
use relplan_core::error::{Error, Result};
use relplan_core::expr::{CompareOp, Expr};
use relplan_core::plan::{Operator, PlanNode};
use relplan_core::trace::emit_event;
use relplan_core::types::Scalar;
use relplan_stats::{ContainerCatalog, StatisticProvider, StatsError};

use crate::cost::adjust_filtered_row_count;

/// Row estimate for a scan whose container has no registered statistics.
pub const DEFAULT_SCAN_ROWS: f64 = 1000.0;

pub trait MetadataQuery {
    /// Settings behind every estimate, including the filter row floor.
    fn config(&self) -> &PlannerConfig;

    /// Rows held by the container a scan reads.
    fn scan_row_count(&self, scan: &PlanNode) -> Result<f64>;

    /// Fraction of `input`'s rows that satisfy `predicate`, if known. The
    /// value is opaque to callers and is sanitized before use.
    fn selectivity(&self, input: &PlanNode, predicate: &Expr) -> Option<f64>;

    /// Estimated number of rows produced by `node`.
    fn row_count(&self, node: &PlanNode) -> Result<f64> {
        match &node.op {
            Operator::Scan(_) => self.scan_row_count(node),
            Operator::Filter(filter) => {
                let input = node.input()?;
                let rows = self.row_count(input)?;
                let selectivity = self.selectivity(input, &filter.predicate);
                Ok(adjust_filtered_row_count(rows, selectivity, self.config()))
            }
            Operator::Project(_) | Operator::Root => self.row_count(node.input()?),
        }
    }
}

/// Metadata backed by the statistics oracle for leaves and heuristic
/// selectivities for predicates.
pub struct StatsMetadataQuery {
    catalog: Arc<ContainerCatalog>,
    provider: Arc<dyn StatisticProvider>,
    config: PlannerConfig,
}

impl StatsMetadataQuery {
    pub fn new(
        catalog: Arc<ContainerCatalog>,
        provider: Arc<dyn StatisticProvider>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            catalog,
            provider,
            config,
        }
    }

    fn container_rows(&self, container: &str) -> Result<f64> {
        match self.catalog.get(container) {
            Ok(c) => Ok(self.provider.row_count(c.as_ref())? as f64),
            Err(StatsError::UnknownContainer(_)) => {
                emit_event(
                    "stats.default_rows",
                    &[("container", container.to_string())],
                );
                Ok(DEFAULT_SCAN_ROWS)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl MetadataQuery for StatsMetadataQuery {
    fn config(&self) -> &PlannerConfig {
        &self.config
    }

    fn scan_row_count(&self, scan: &PlanNode) -> Result<f64> {
        match &scan.op {
            Operator::Scan(op) => self.container_rows(&op.container),
            _ => Err(Error::Invariant(format!(
                "scan row count requested for a {} node",
                scan.kind()
            ))),
        }
    }

    fn selectivity(&self, _input: &PlanNode, predicate: &Expr) -> Option<f64> {
        Some(guess_selectivity(predicate, self.config.default_selectivity))
    }
}

/// Fixed per-shape guesses, combined assuming independent conjuncts.
pub fn guess_selectivity(predicate: &Expr, default: f64) -> f64 {
    match predicate {
        Expr::Literal(Scalar::Bool(true)) => 1.0,
        Expr::Literal(Scalar::Bool(false) | Scalar::Null) => 0.0,
        Expr::Compare { op, .. } => match op {
            CompareOp::Eq => 0.15,
            CompareOp::NotEq => 0.85,
            CompareOp::Lt | CompareOp::LtEq | CompareOp::Gt | CompareOp::GtEq => 0.5,
        },
        Expr::IsNotNull(_) => 0.9,
        Expr::IsNull(_) => 0.1,
        Expr::And(items) => items
            .iter()
            .map(|e| guess_selectivity(e, default))
            .product(),
        Expr::Or(items) => items.iter().fold(0.0, |acc, e| {
            let s = guess_selectivity(e, default);
            acc + s - acc * s
        }),
        Expr::Not(inner) => 1.0 - guess_selectivity(inner, default),
        _ => default,
    }
}
