//! Lazily decoded column values.
//!
//! A `LazyTarget` starts out holding an encoded payload. The first forced
//! read decodes it and replaces the payload with the decoded value, so a slot
//! is decoded at most once. The transition happens under a mutex: a row may
//! be shared, but only one reader ever performs the decode.
//!
//! A `LazyTarget` is not `Clone`. Rows hold it behind an `Arc`, so every copy
//! of a row forces and memoizes into the same cell.

use std::sync::Mutex;

use relplan_core::types::Scalar;

use crate::error::Result;

/// Turns an encoded payload into a value.
pub trait LazyDeserializer: Send + Sync {
    fn deserialize(&self, payload: &[u8]) -> Result<Scalar>;
}

#[derive(Debug, PartialEq)]
enum LazyState {
    Encoded(Vec<u8>),
    Decoded(Scalar),
}

/// What `LazyTarget::raw` observed, without forcing a decode.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Encoded(Vec<u8>),
    Value(Scalar),
}

#[derive(Debug)]
pub struct LazyTarget {
    state: Mutex<LazyState>,
}

impl LazyTarget {
    pub fn encoded(payload: Vec<u8>) -> Self {
        Self {
            state: Mutex::new(LazyState::Encoded(payload)),
        }
    }

    pub fn decoded(value: Scalar) -> Self {
        Self {
            state: Mutex::new(LazyState::Decoded(value)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LazyState> {
        // A panicking deserializer leaves the state untouched, so a poisoned
        // lock still guards a consistent value.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_decoded(&self) -> bool {
        matches!(*self.lock(), LazyState::Decoded(_))
    }

    /// Decode on first call, return the memoized value afterwards. A failed
    /// decode leaves the payload in place.
    pub fn force(&self, deserializer: &dyn LazyDeserializer) -> Result<Scalar> {
        let mut state = self.lock();
        let value = match &*state {
            LazyState::Decoded(v) => return Ok(v.clone()),
            LazyState::Encoded(payload) => deserializer.deserialize(payload)?,
        };
        *state = LazyState::Decoded(value.clone());
        Ok(value)
    }

    /// The encoded payload if still present, else the decoded value.
    pub fn raw(&self) -> RawValue {
        match &*self.lock() {
            LazyState::Encoded(payload) => RawValue::Encoded(payload.clone()),
            LazyState::Decoded(v) => RawValue::Value(v.clone()),
        }
    }
}
