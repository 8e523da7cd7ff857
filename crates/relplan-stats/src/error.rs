use thiserror::Error;

use crate::container::ContainerKind;

/// Result type local to relplan-stats.
pub type Result<T> = std::result::Result<T, StatsError>;

#[derive(Debug, Error)]
pub enum StatsError {
    /// The provider was handed a container kind it has no size source for.
    #[error("no row-count source for container '{name}' of kind {kind}")]
    UnsupportedContainer { name: String, kind: ContainerKind },

    #[error("container '{0}' is not registered")]
    UnknownContainer(String),
}

impl From<StatsError> for relplan_core::error::Error {
    fn from(e: StatsError) -> Self {
        match e {
            StatsError::UnsupportedContainer { .. } => {
                relplan_core::error::Error::Invariant(e.to_string())
            }
            StatsError::UnknownContainer(_) => relplan_core::error::Error::Plan(e.to_string()),
        }
    }
}
