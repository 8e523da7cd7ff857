//! Planner configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How two costs are ranked against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostOrdering {
    /// Row count dominates, CPU breaks ties, then I/O.
    #[default]
    RowsThenCpu,
    /// CPU dominates, row count breaks ties, then I/O.
    CpuThenRows,
    /// Single scalar: cpu plus io, with io weighted ten times heavier.
    Total,
}

impl CostOrdering {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rows_then_cpu" | "rows" => Ok(CostOrdering::RowsThenCpu),
            "cpu_then_rows" | "cpu" => Ok(CostOrdering::CpuThenRows),
            "total" => Ok(CostOrdering::Total),
            other => Err(Error::Config(format!("unknown cost ordering '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Comparison used to rank alternative physical plans.
    pub cost_ordering: CostOrdering,

    /// Lower bound for a filter's output row estimate (never above the
    /// input row count). Keeps zero-selectivity filters from looking free.
    pub min_filtered_rows: f64,

    /// Selectivity used when no estimate is available for a predicate.
    pub default_selectivity: f64,

    /// CPU units per projected expression per input row.
    pub project_cpu_per_expr: f64,

    /// Compile a project directly over a filter into a single vertex.
    pub fuse_operators: bool,

    /// Parallelism hint stamped on every vertex (runtime default if `None`).
    pub local_parallelism: Option<u32>,

    /// How long cached container statistics stay fresh.
    pub stats_refresh_ms: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            cost_ordering: CostOrdering::RowsThenCpu,
            min_filtered_rows: 1.0,
            default_selectivity: 0.25,
            project_cpu_per_expr: 1.0,
            fuse_operators: false,
            local_parallelism: None,
            stats_refresh_ms: 1_000,
        }
    }
}

impl PlannerConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `RELPLAN_COST_ORDERING`: `rows_then_cpu`, `cpu_then_rows` or `total`
    /// - `RELPLAN_MIN_FILTERED_ROWS`: filter row-estimate floor
    /// - `RELPLAN_DEFAULT_SELECTIVITY`: fallback predicate selectivity
    /// - `RELPLAN_PROJECT_CPU_PER_EXPR`: projection CPU factor
    /// - `RELPLAN_FUSE_OPERATORS`: `true`/`false`
    /// - `RELPLAN_LOCAL_PARALLELISM`: per-vertex parallelism hint
    /// - `RELPLAN_STATS_REFRESH_MS`: statistics cache lifetime
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("RELPLAN_COST_ORDERING") {
            if let Ok(v) = CostOrdering::parse(&s) {
                cfg.cost_ordering = v;
            }
        }

        if let Ok(s) = std::env::var("RELPLAN_MIN_FILTERED_ROWS") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.min_filtered_rows = v;
            }
        }

        if let Ok(s) = std::env::var("RELPLAN_DEFAULT_SELECTIVITY") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.default_selectivity = v;
            }
        }

        if let Ok(s) = std::env::var("RELPLAN_PROJECT_CPU_PER_EXPR") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.project_cpu_per_expr = v;
            }
        }

        if let Ok(s) = std::env::var("RELPLAN_FUSE_OPERATORS") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.fuse_operators = v;
            }
        }

        if let Ok(s) = std::env::var("RELPLAN_LOCAL_PARALLELISM") {
            if let Ok(v) = s.parse::<u32>() {
                cfg.local_parallelism = Some(v);
            }
        }

        if let Ok(s) = std::env::var("RELPLAN_STATS_REFRESH_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.stats_refresh_ms = v;
            }
        }

        cfg
    }

    /// Reject values that would make cost arithmetic meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_filtered_rows.is_finite() && self.min_filtered_rows >= 0.0) {
            return Err(Error::Config(format!(
                "min_filtered_rows must be a non-negative number, got {}",
                self.min_filtered_rows
            )));
        }
        if !(0.0..=1.0).contains(&self.default_selectivity) {
            return Err(Error::Config(format!(
                "default_selectivity must be within [0, 1], got {}",
                self.default_selectivity
            )));
        }
        if !(self.project_cpu_per_expr.is_finite() && self.project_cpu_per_expr >= 0.0) {
            return Err(Error::Config(format!(
                "project_cpu_per_expr must be a non-negative number, got {}",
                self.project_cpu_per_expr
            )));
        }
        if self.local_parallelism == Some(0) {
            return Err(Error::Config("local_parallelism must be at least 1".into()));
        }
        Ok(())
    }
}
