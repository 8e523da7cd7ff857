//! Three-part cost model for physical operators.
//!
//! `compute_self_cost` is a free function over the node and a metadata query:
//! no state, no caching. Callers recompute whenever a node or its inputs
//! change. Row estimates and the planner config both come from the metadata
//! query, so a filter's self rows are exactly what its parent reads.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use relplan_core::config::{CostOrdering, PlannerConfig};
use relplan_core::error::{Error, Result};
use relplan_core::plan::{Operator, PlanNode};
use relplan_core::trace::emit_event;

use crate::metadata::MetadataQuery;

/// Weight of one I/O unit against one CPU unit under `CostOrdering::Total`.
pub const IO_WEIGHT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub rows: f64,
    pub cpu: f64,
    pub io: f64,
}

/// NaN and negative components become zero.
fn sanitize(v: f64) -> f64 {
    if v.is_nan() || v < 0.0 {
        0.0
    } else {
        v
    }
}

impl Cost {
    pub fn new(rows: f64, cpu: f64, io: f64) -> Self {
        Self {
            rows: sanitize(rows),
            cpu: sanitize(cpu),
            io: sanitize(io),
        }
    }

    pub const fn zero() -> Self {
        Self {
            rows: 0.0,
            cpu: 0.0,
            io: 0.0,
        }
    }

    pub fn plus(&self, other: &Cost) -> Cost {
        Cost::new(
            self.rows + other.rows,
            self.cpu + other.cpu,
            self.io + other.io,
        )
    }

    /// Scalar used by `CostOrdering::Total`.
    pub fn total(&self) -> f64 {
        self.cpu + IO_WEIGHT * self.io
    }

    pub fn compare(&self, other: &Cost, ordering: CostOrdering) -> Ordering {
        match ordering {
            CostOrdering::RowsThenCpu => self
                .rows
                .total_cmp(&other.rows)
                .then(self.cpu.total_cmp(&other.cpu))
                .then(self.io.total_cmp(&other.io)),
            CostOrdering::CpuThenRows => self
                .cpu
                .total_cmp(&other.cpu)
                .then(self.rows.total_cmp(&other.rows))
                .then(self.io.total_cmp(&other.io)),
            CostOrdering::Total => self
                .total()
                .total_cmp(&other.total())
                .then(self.rows.total_cmp(&other.rows)),
        }
    }

    pub fn is_lt(&self, other: &Cost, ordering: CostOrdering) -> bool {
        self.compare(other, ordering) == Ordering::Less
    }
}

impl Default for Cost {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{} rows, {} cpu, {} io}}",
            self.rows, self.cpu, self.io
        )
    }
}

/// Output row estimate of a filter over `input_rows` rows.
///
/// Clamps degenerate inputs (NaN or negative rows become 0, a missing or NaN
/// selectivity becomes the configured default, then [0, 1]) and applies the
/// floor: the result is `max(R * s, min(R, min_filtered_rows))`. It never
/// exceeds `R`, never decreases as `s` grows, and a non-empty input never
/// estimates to zero rows.
pub fn adjust_filtered_row_count(
    input_rows: f64,
    selectivity: Option<f64>,
    config: &PlannerConfig,
) -> f64 {
    let rows = sanitize(input_rows);
    let s = match selectivity {
        Some(s) if !s.is_nan() => s,
        _ => config.default_selectivity,
    }
    .clamp(0.0, 1.0);
    let floor = sanitize(config.min_filtered_rows);
    (rows * s).max(rows.min(floor))
}

/// Incremental cost of a single physical node, from its inputs' row
/// estimates plus, for scans, the statistics oracle.
pub fn compute_self_cost(node: &PlanNode, mq: &dyn MetadataQuery) -> Result<Cost> {
    if !node.is_physical() {
        return Err(Error::NotPhysical {
            kind: node.kind(),
            convention: node.convention(),
        });
    }
    let cost = match &node.op {
        Operator::Scan(_) => {
            let rows = mq.row_count(node)?;
            Cost::new(rows, rows, rows)
        }
        Operator::Filter(_) => {
            let input_rows = sanitize(mq.row_count(node.input()?)?);
            let rows = sanitize(mq.row_count(node)?);
            Cost::new(rows, input_rows, 0.0)
        }
        Operator::Project(project) => {
            let input_rows = sanitize(mq.row_count(node.input()?)?);
            let width = project.exprs.len().max(1) as f64;
            Cost::new(
                input_rows,
                input_rows * width * mq.config().project_cpu_per_expr,
                0.0,
            )
        }
        Operator::Root => {
            let input_rows = mq.row_count(node.input()?)?;
            Cost::new(input_rows, input_rows, 0.0)
        }
    };
    emit_event(
        "cost.self",
        &[("kind", node.kind().to_string()), ("cost", cost.to_string())],
    );
    Ok(cost)
}

/// Self cost of `node` plus the cumulative cost of every input.
pub fn cumulative_cost(node: &PlanNode, mq: &dyn MetadataQuery) -> Result<Cost> {
    node.inputs.iter().try_fold(compute_self_cost(node, mq)?, |acc, input| {
        Ok(acc.plus(&cumulative_cost(input, mq)?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default_rules;
    use relplan_core::expr::Expr;
    use relplan_core::plan::Convention;
    use relplan_core::schema::{DataType, Field, Schema};
    use relplan_core::types::Scalar;
    use std::sync::Arc;

    /// Same container size and selectivity for every node asked about.
    struct Fixed {
        rows: f64,
        selectivity: Option<f64>,
        config: PlannerConfig,
    }

    impl Fixed {
        fn new(rows: f64, selectivity: Option<f64>) -> Self {
            Self {
                rows,
                selectivity,
                config: PlannerConfig::default(),
            }
        }
    }

    impl MetadataQuery for Fixed {
        fn config(&self) -> &PlannerConfig {
            &self.config
        }
        fn scan_row_count(&self, _: &PlanNode) -> Result<f64> {
            Ok(self.rows)
        }
        fn selectivity(&self, _: &PlanNode, _: &Expr) -> Option<f64> {
            self.selectivity
        }
    }

    fn physical(node: Arc<PlanNode>) -> Arc<PlanNode> {
        default_rules().convert(&node, Convention::Physical).unwrap()
    }

    fn scan() -> Arc<PlanNode> {
        PlanNode::scan(
            "t",
            Schema::new(vec![Field::new("a", DataType::Int32, true)]),
        )
    }

    #[test]
    fn floor_applies_only_to_nonempty_input() {
        let cfg = PlannerConfig::default();
        assert_eq!(adjust_filtered_row_count(0.0, Some(0.5), &cfg), 0.0);
        assert_eq!(adjust_filtered_row_count(100.0, Some(0.0), &cfg), 1.0);
        assert_eq!(adjust_filtered_row_count(0.5, Some(0.0), &cfg), 0.5);
        assert_eq!(adjust_filtered_row_count(100.0, Some(1.0), &cfg), 100.0);
    }

    #[test]
    fn degenerate_inputs_are_clamped() {
        let cfg = PlannerConfig::default();
        assert_eq!(adjust_filtered_row_count(f64::NAN, Some(0.5), &cfg), 0.0);
        assert_eq!(adjust_filtered_row_count(-5.0, Some(0.5), &cfg), 0.0);
        assert_eq!(adjust_filtered_row_count(100.0, Some(f64::NAN), &cfg), 25.0);
        assert_eq!(adjust_filtered_row_count(100.0, None, &cfg), 25.0);
        assert_eq!(adjust_filtered_row_count(100.0, Some(7.0), &cfg), 100.0);
        assert_eq!(adjust_filtered_row_count(100.0, Some(-1.0), &cfg), 1.0);
    }

    #[test]
    fn filter_cpu_is_input_rows() {
        let filter = physical(PlanNode::filter(scan(), Expr::literal(Scalar::Bool(true))));
        let mq = Fixed::new(80.0, Some(0.5));
        let cost = compute_self_cost(&filter, &mq).unwrap();
        assert_eq!(cost, Cost::new(40.0, 80.0, 0.0));
    }

    #[test]
    fn filter_rows_match_what_the_parent_reads() {
        let project = physical(PlanNode::project(
            PlanNode::filter(scan(), Expr::literal(Scalar::Bool(false))),
            vec![Expr::column(0)],
            Schema::default(),
        ));
        let mut mq = Fixed::new(5000.0, Some(0.0));
        mq.config.min_filtered_rows = 100.0;
        let filter = project.input().unwrap();

        let filter_cost = compute_self_cost(filter, &mq).unwrap();
        let project_cost = compute_self_cost(&project, &mq).unwrap();
        assert_eq!(filter_cost.rows, 100.0);
        assert_eq!(project_cost.rows, filter_cost.rows);
        assert_eq!(mq.row_count(filter).unwrap(), filter_cost.rows);
    }

    #[test]
    fn project_cpu_scales_with_width() {
        let project = physical(PlanNode::project(
            scan(),
            vec![Expr::column(0), Expr::column(0), Expr::column(0)],
            Schema::default(),
        ));
        let mut mq = Fixed::new(10.0, None);
        mq.config.project_cpu_per_expr = 2.0;
        let cost = compute_self_cost(&project, &mq).unwrap();
        assert_eq!(cost, Cost::new(10.0, 60.0, 0.0));
    }

    #[test]
    fn empty_projection_still_costs_one_unit_per_row() {
        let project = physical(PlanNode::project(scan(), vec![], Schema::default()));
        let mq = Fixed::new(10.0, None);
        let cost = compute_self_cost(&project, &mq).unwrap();
        assert_eq!(cost.cpu, 10.0);
    }

    #[test]
    fn scan_supplies_io() {
        let mq = Fixed::new(12.0, None);
        let cost = compute_self_cost(&physical(scan()), &mq).unwrap();
        assert_eq!(cost, Cost::new(12.0, 12.0, 12.0));
    }

    #[test]
    fn logical_node_cannot_be_costed() {
        let logical = default_rules().convert(&scan(), Convention::Logical).unwrap();
        let mq = Fixed::new(1.0, None);
        assert!(compute_self_cost(&logical, &mq).is_err());
    }

    #[test]
    fn cumulative_sums_the_subtree() {
        let plan = physical(PlanNode::root(scan()));
        let mq = Fixed::new(5.0, None);
        let cost = cumulative_cost(&plan, &mq).unwrap();
        assert_eq!(cost, Cost::new(10.0, 10.0, 5.0));
    }

    #[test]
    fn orderings_rank_differently() {
        let few_rows = Cost::new(10.0, 500.0, 0.0);
        let cheap_cpu = Cost::new(20.0, 100.0, 0.0);
        assert!(few_rows.is_lt(&cheap_cpu, CostOrdering::RowsThenCpu));
        assert!(cheap_cpu.is_lt(&few_rows, CostOrdering::CpuThenRows));

        let heavy_io = Cost::new(1.0, 10.0, 10.0);
        let heavy_cpu = Cost::new(1.0, 100.0, 0.0);
        assert!(heavy_cpu.is_lt(&heavy_io, CostOrdering::Total));
    }

    #[test]
    fn constructor_clamps_components() {
        let c = Cost::new(f64::NAN, -3.0, 2.0);
        assert_eq!(c, Cost::new(0.0, 0.0, 2.0));
    }
}
