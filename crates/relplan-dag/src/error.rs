use thiserror::Error;

use relplan_core::id::VertexId;

/// Result type local to relplan-dag.
pub type Result<T> = std::result::Result<T, DagError>;

#[derive(Debug, Error)]
pub enum DagError {
    /// Conversion or binding failure while visiting the plan, including
    /// reaching a node that is not physical.
    #[error(transparent)]
    Plan(#[from] relplan_core::error::Error),

    #[error("unknown vertex {0}")]
    UnknownVertex(VertexId),

    #[error("malformed graph: {0}")]
    Malformed(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl DagError {
    /// True when the plan handed to the compiler broke a planner contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, DagError::Plan(e) if e.is_contract_violation())
    }
}
