//! Pipeline DSL: YAML documents describing a linear scan → … → root plan,
//! with predicate and projection text parsed into typed expressions.

pub mod expr;
pub mod yaml;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DslError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid pipeline: {0}")]
    Invalid(String),

    #[error("Cannot parse expression \"{text}\": {message}")]
    Expr { text: String, message: String },

    #[error(transparent)]
    Plan(#[from] relplan_core::error::Error),
}

pub type Result<T> = std::result::Result<T, DslError>;
