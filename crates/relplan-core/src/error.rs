use thiserror::Error;

use crate::plan::{Convention, OpKind};

/// Canonical result for core and the planning crates built on it.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Planning error: {0}")]
    Plan(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("Evaluation error: {0}")]
    Eval(String),

    /// A conversion rule was handed a node it does not own.
    #[error("rule '{rule}' cannot convert {kind} node with convention {convention}")]
    RuleMismatch {
        rule: &'static str,
        kind: OpKind,
        convention: Convention,
    },

    /// Compilation reached a node that never made it to the physical convention.
    #[error("{kind} node has convention {convention}, expected PHYSICAL")]
    NotPhysical { kind: OpKind, convention: Convention },

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl Error {
    /// True for errors that indicate an upstream programming defect rather
    /// than bad user input.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::RuleMismatch { .. } | Error::NotPhysical { .. } | Error::Invariant(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
