#![forbid(unsafe_code)]
//! relplan-row: the row contract shared by physical operators and clients.
//!
//! A row is a fixed-width sequence of slots. A slot holds either a
//! materialized `Scalar` or a `LazyTarget`: a still-encoded payload that is
//! decoded on first read and memoized in place. `SqlRow` adds metadata-aware
//! access (by index or case-sensitive name) and the argument checks that
//! user-facing code needs.

pub mod codec;
pub mod error;
pub mod lazy;
pub mod metadata;
pub mod row;

pub use codec::{decode_scalar, encode_scalar, WireDeserializer};
pub use error::{Result, RowError};
pub use lazy::{LazyDeserializer, LazyTarget, RawValue};
pub use metadata::{ColumnMetadata, RowMetadata};
pub use row::{ColumnIndex, Row, RowSet, Slot, SqlRow};
