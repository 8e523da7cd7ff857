//! Rows and the metadata-aware `SqlRow` view handed to clients.

use std::fmt;
use std::sync::Arc;

use relplan_core::types::Scalar;

use crate::codec::WireDeserializer;
use crate::error::{Result, RowError};
use crate::lazy::{LazyDeserializer, LazyTarget, RawValue};
use crate::metadata::RowMetadata;

/// Cloning a slot shares its lazy cell: a decode through any clone is seen
/// by all of them.
#[derive(Debug, Clone)]
pub enum Slot {
    Value(Scalar),
    Lazy(Arc<LazyTarget>),
}

impl Slot {
    pub fn encoded(payload: Vec<u8>) -> Self {
        Slot::Lazy(Arc::new(LazyTarget::encoded(payload)))
    }
}

impl From<Scalar> for Slot {
    fn from(v: Scalar) -> Self {
        Slot::Value(v)
    }
}

/// Internal row: no bounds checks beyond slice indexing.
#[derive(Debug, Clone, Default)]
pub struct Row {
    slots: Vec<Slot>,
}

impl Row {
    pub fn new(slots: Vec<Slot>) -> Self {
        Self { slots }
    }

    pub fn from_values(values: Vec<Scalar>) -> Self {
        Self::new(values.into_iter().map(Slot::Value).collect())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }
}

/// Anything that can address a column of a `SqlRow`.
///
/// Integers address by 0-based position (negative values are out of range),
/// strings by case-sensitive name.
pub trait ColumnIndex {
    fn resolve(&self, metadata: &RowMetadata) -> Result<usize>;
}

fn check_index(index: i64, metadata: &RowMetadata) -> Result<usize> {
    let count = metadata.column_count();
    if index < 0 || index >= count as i64 {
        return Err(RowError::IndexOutOfRange { index, count });
    }
    Ok(index as usize)
}

impl ColumnIndex for usize {
    fn resolve(&self, metadata: &RowMetadata) -> Result<usize> {
        let index = i64::try_from(*self).unwrap_or(i64::MAX);
        check_index(index, metadata)
    }
}

impl ColumnIndex for i64 {
    fn resolve(&self, metadata: &RowMetadata) -> Result<usize> {
        check_index(*self, metadata)
    }
}

impl ColumnIndex for i32 {
    fn resolve(&self, metadata: &RowMetadata) -> Result<usize> {
        check_index(i64::from(*self), metadata)
    }
}

impl ColumnIndex for str {
    fn resolve(&self, metadata: &RowMetadata) -> Result<usize> {
        metadata
            .find_column(self)
            .ok_or_else(|| RowError::UnknownColumn(self.to_string()))
    }
}

impl ColumnIndex for String {
    fn resolve(&self, metadata: &RowMetadata) -> Result<usize> {
        self.as_str().resolve(metadata)
    }
}

impl<T: ColumnIndex + ?Sized> ColumnIndex for &T {
    fn resolve(&self, metadata: &RowMetadata) -> Result<usize> {
        (**self).resolve(metadata)
    }
}

/// A result row exposed to clients: metadata, values, and the deserializer
/// used to force lazy slots. Clones share lazy slots with the original.
#[derive(Clone)]
pub struct SqlRow {
    metadata: Arc<RowMetadata>,
    row: Row,
    deserializer: Arc<dyn LazyDeserializer>,
}

impl SqlRow {
    pub fn new(
        metadata: Arc<RowMetadata>,
        row: Row,
        deserializer: Arc<dyn LazyDeserializer>,
    ) -> Result<Self> {
        if row.len() != metadata.column_count() {
            return Err(RowError::ColumnCountMismatch {
                expected: metadata.column_count(),
                actual: row.len(),
            });
        }
        Ok(Self {
            metadata,
            row,
            deserializer,
        })
    }

    /// Convenience constructor using the wire codec.
    pub fn with_wire_codec(metadata: Arc<RowMetadata>, row: Row) -> Result<Self> {
        Self::new(metadata, row, Arc::new(WireDeserializer))
    }

    pub fn metadata(&self) -> &RowMetadata {
        &self.metadata
    }

    pub fn column_count(&self) -> usize {
        self.metadata.column_count()
    }

    /// Decoded value of a column; forces and memoizes lazy slots.
    pub fn get<I: ColumnIndex>(&self, column: I) -> Result<Scalar> {
        let index = column.resolve(&self.metadata)?;
        match self.slot(index)? {
            Slot::Value(v) => Ok(v.clone()),
            Slot::Lazy(target) => target.force(self.deserializer.as_ref()),
        }
    }

    /// Value of a column without forcing a decode: the encoded payload if the
    /// slot was never read, the memoized value otherwise.
    pub fn get_raw<I: ColumnIndex>(&self, column: I) -> Result<RawValue> {
        let index = column.resolve(&self.metadata)?;
        match self.slot(index)? {
            Slot::Value(v) => Ok(RawValue::Value(v.clone())),
            Slot::Lazy(target) => Ok(target.raw()),
        }
    }

    fn slot(&self, index: usize) -> Result<&Slot> {
        self.row.slot(index).ok_or(RowError::IndexOutOfRange {
            index: index as i64,
            count: self.row.len(),
        })
    }
}

impl fmt::Display for SqlRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, column) in self.metadata.columns().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            // Rendering must not decode; show what is there.
            match self.row.slot(i) {
                Some(Slot::Value(v)) => write!(f, "{column}={v}")?,
                Some(Slot::Lazy(target)) => match target.raw() {
                    RawValue::Value(v) => write!(f, "{column}={v}")?,
                    RawValue::Encoded(bytes) => write!(f, "{column}=<{} bytes>", bytes.len())?,
                },
                None => write!(f, "{column}=?")?,
            }
        }
        f.write_str("]")
    }
}

impl fmt::Debug for SqlRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SqlRow{self}")
    }
}

/// A batch of rows sharing one metadata and deserializer.
pub struct RowSet {
    metadata: Arc<RowMetadata>,
    deserializer: Arc<dyn LazyDeserializer>,
    rows: Vec<Row>,
}

impl RowSet {
    pub fn new(metadata: RowMetadata, deserializer: Arc<dyn LazyDeserializer>) -> Self {
        Self {
            metadata: Arc::new(metadata),
            deserializer,
            rows: Vec::new(),
        }
    }

    pub fn metadata(&self) -> &RowMetadata {
        &self.metadata
    }

    pub fn push(&mut self, row: Row) -> Result<()> {
        if row.len() != self.metadata.column_count() {
            return Err(RowError::ColumnCountMismatch {
                expected: self.metadata.column_count(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Client view of each row, in insertion order. Views share the stored
    /// lazy slots, so a value decoded through one view stays decoded.
    pub fn iter(&self) -> impl Iterator<Item = SqlRow> + '_ {
        self.rows.iter().map(|row| SqlRow {
            metadata: Arc::clone(&self.metadata),
            row: row.clone(),
            deserializer: Arc::clone(&self.deserializer),
        })
    }
}
