//! The row-count oracle consulted by leaf-level cost computation.

use relplan_core::trace::emit_event;

use crate::container::{ContainerKind, DataContainer};
use crate::error::{Result, StatsError};

/// Supplies the approximate cardinality of a container.
///
/// Callers treat the answer as "approximately current", nothing more.
pub trait StatisticProvider: Send + Sync {
    fn row_count(&self, container: &dyn DataContainer) -> Result<u64>;
}

/// Reads the live entry counters of map containers.
///
/// Any other container kind is rejected: guessing a number for a container
/// we cannot size would quietly skew every plan built on top of it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStatisticProvider;

impl StatisticProvider for DefaultStatisticProvider {
    fn row_count(&self, container: &dyn DataContainer) -> Result<u64> {
        let unsupported = || StatsError::UnsupportedContainer {
            name: container.name().to_string(),
            kind: container.kind(),
        };
        match container.kind() {
            ContainerKind::PartitionedMap | ContainerKind::ReplicatedMap => {
                let rows = container.approximate_size().ok_or_else(unsupported)?;
                emit_event(
                    "stats.row_count",
                    &[
                        ("container", container.name().to_string()),
                        ("rows", rows.to_string()),
                    ],
                );
                Ok(rows)
            }
            ContainerKind::Queue | ContainerKind::List | ContainerKind::Topic => {
                Err(unsupported())
            }
        }
    }
}
