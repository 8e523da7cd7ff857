//! Convenient re-exports for downstream crates.

pub use crate::config::{CostOrdering, PlannerConfig};
pub use crate::error::{Error, Result};
pub use crate::expr::{ArithOp, CompareOp, Expr};
pub use crate::id::{DagId, EdgeId, VertexId};
pub use crate::plan::{
    Convention, Distribution, FilterOp, OpKind, Operator, PlanNode, ProjectOp, ScanOp, TraitSet,
};
pub use crate::schema::{DataType, Field, Schema};
pub use crate::types::Scalar;
