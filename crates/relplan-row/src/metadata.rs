//! Column descriptions attached to a batch of rows.

use std::fmt;

use serde::{Deserialize, Serialize};

use relplan_core::schema::{DataType, Field, Schema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

impl From<&Field> for ColumnMetadata {
    fn from(f: &Field) -> Self {
        Self::new(f.name.clone(), f.data_type, f.nullable)
    }
}

impl fmt::Display for ColumnMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowMetadata {
    columns: Vec<ColumnMetadata>,
}

impl RowMetadata {
    pub fn new(columns: Vec<ColumnMetadata>) -> Self {
        Self { columns }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&ColumnMetadata> {
        self.columns.get(index)
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    /// Case-sensitive exact match; first match wins on duplicate names.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

impl From<&Schema> for RowMetadata {
    fn from(schema: &Schema) -> Self {
        Self::new(schema.fields.iter().map(ColumnMetadata::from).collect())
    }
}
