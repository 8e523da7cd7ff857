//! Tracing hook shared by the planning crates.
//!
//! This module purposefully avoids pulling telemetry stacks into core.
//! Enable the `tracing` feature and install a subscriber in the binary layer.

#[cfg(feature = "tracing")]
pub fn emit_event(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::span!(tracing::Level::DEBUG, "relplan", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::debug!(%event, %k, %v, "plan");
    }
    if key_values.is_empty() {
        tracing::debug!(%event, "plan");
    }
}

#[cfg(not(feature = "tracing"))]
pub fn emit_event(_event: &str, _key_values: &[(&str, String)]) { /* no-op */
}
