//! Vertex payloads: a serializable description of the work each vertex does.

use serde::{Deserialize, Serialize};

use relplan_core::error::Result;
use relplan_core::expr::Expr;
use relplan_core::id::VertexId;
use relplan_core::plan::Distribution;
use relplan_core::schema::Schema;
use relplan_core::types::Scalar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessorSpec {
    /// Emit every entry of a container, reading only local partitions.
    Scan { container: String },
    Filter { predicate: Expr },
    Project { exprs: Vec<Expr> },
    /// Filter then project in one pass over each row.
    Calc { predicate: Expr, exprs: Vec<Expr> },
    /// Hand rows to the client.
    Root,
}

impl ProcessorSpec {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ProcessorSpec::Scan { .. } => "scan",
            ProcessorSpec::Filter { .. } => "filter",
            ProcessorSpec::Project { .. } => "project",
            ProcessorSpec::Calc { .. } => "calc",
            ProcessorSpec::Root => "root",
        }
    }

    /// Run one input row through this processor. `None` means the row was
    /// dropped. Sources and the root pass rows through unchanged.
    pub fn process(&self, row: Vec<Scalar>) -> Result<Option<Vec<Scalar>>> {
        match self {
            ProcessorSpec::Scan { .. } | ProcessorSpec::Root => Ok(Some(row)),
            ProcessorSpec::Filter { predicate } => {
                Ok(predicate.eval_predicate(&row)?.then_some(row))
            }
            ProcessorSpec::Project { exprs } => project(exprs, &row).map(Some),
            ProcessorSpec::Calc { predicate, exprs } => {
                if predicate.eval_predicate(&row)? {
                    project(exprs, &row).map(Some)
                } else {
                    Ok(None)
                }
            }
        }
    }
}

fn project(exprs: &[Expr], row: &[Scalar]) -> Result<Vec<Scalar>> {
    exprs.iter().map(|e| e.eval(row)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub name: String,
    /// `None` leaves the choice to the runtime.
    pub local_parallelism: Option<u32>,
    pub distribution: Distribution,
    /// Rows this vertex emits.
    pub schema: Schema,
    pub processor: ProcessorSpec,
}
