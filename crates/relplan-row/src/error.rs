use thiserror::Error;

/// Result type local to relplan-row.
pub type Result<T> = std::result::Result<T, RowError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("Column \"{0}\" doesn't exist")]
    UnknownColumn(String),

    #[error("Column index is out of range: {index}")]
    IndexOutOfRange { index: i64, count: usize },

    #[error("failed to decode column value: {0}")]
    Decode(String),

    #[error("row has {actual} values but metadata declares {expected} columns")]
    ColumnCountMismatch { expected: usize, actual: usize },
}

impl RowError {
    pub fn is_unknown_column(&self) -> bool {
        matches!(self, RowError::UnknownColumn(_))
    }

    pub fn is_out_of_range(&self) -> bool {
        matches!(self, RowError::IndexOutOfRange { .. })
    }
}
