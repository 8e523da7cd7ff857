#![forbid(unsafe_code)]
//! relplan-stats: approximate cardinality of distributed data containers.
//!
//! The cost model only needs one number per container: roughly how many
//! entries it holds right now. This crate defines:
//! - the `DataContainer` view of a container (`container`)
//! - the `StatisticProvider` oracle and its default implementation (`provider`)
//! - a caching wrapper that refreshes counts periodically (`cache`)
//!
//! Counts are advisory. Readers never block writers; a count may lag
//! concurrent inserts/removes.

pub mod cache;
pub mod container;
pub mod error;
pub mod provider;

pub use cache::CachingStatisticProvider;
pub use container::{ContainerCatalog, ContainerKind, DataContainer, PartitionedMap, ReplicatedMap};
pub use error::{Result, StatsError};
pub use provider::{DefaultStatisticProvider, StatisticProvider};
