//! Distributed data containers as seen by the statistics oracle.
//!
//! Only the parts the oracle needs are modeled: a name, a kind, and a
//! lock-free entry counter that writers bump while readers sample it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};

/// Service a container belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Entries spread across partitions owned by different members.
    PartitionedMap,
    /// Every member holds a full copy.
    ReplicatedMap,
    Queue,
    List,
    Topic,
}

impl ContainerKind {
    pub fn service_name(self) -> &'static str {
        match self {
            ContainerKind::PartitionedMap => "map",
            ContainerKind::ReplicatedMap => "replicated_map",
            ContainerKind::Queue => "queue",
            ContainerKind::List => "list",
            ContainerKind::Topic => "topic",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_name())
    }
}

/// Handle to a named container.
///
/// Implementations must be cheap to query from many threads at once and must
/// not block on concurrent writes.
pub trait DataContainer: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ContainerKind;

    /// Approximate number of entries, if this container keeps a count.
    fn approximate_size(&self) -> Option<u64> {
        None
    }
}

/// Remove one entry from a counter; a remove racing past zero leaves it at
/// zero instead of wrapping.
fn saturating_decrement(counter: &AtomicU64) {
    let mut current = counter.load(Ordering::Relaxed);
    while current > 0 {
        match counter.compare_exchange_weak(
            current,
            current - 1,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

/// Entry counts of a partitioned map, one counter per partition.
pub struct PartitionedMap {
    name: String,
    partitions: Vec<AtomicU64>,
}

impl PartitionedMap {
    pub fn new(name: impl Into<String>, partition_count: usize) -> Self {
        Self {
            name: name.into(),
            partitions: (0..partition_count.max(1)).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    fn slot(&self, partition: usize) -> &AtomicU64 {
        &self.partitions[partition % self.partitions.len()]
    }

    pub fn record_insert(&self, partition: usize) {
        self.slot(partition).fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remove(&self, partition: usize) {
        saturating_decrement(self.slot(partition));
    }

    /// Overwrite one partition's count (e.g. after a migration).
    pub fn set_partition_size(&self, partition: usize, entries: u64) {
        self.slot(partition).store(entries, Ordering::Relaxed);
    }

    /// Spread `entries` evenly across partitions; handy for fixtures.
    pub fn with_entries(self, entries: u64) -> Self {
        let n = self.partitions.len() as u64;
        for (i, p) in self.partitions.iter().enumerate() {
            let extra = u64::from((i as u64) < entries % n);
            p.store(entries / n + extra, Ordering::Relaxed);
        }
        self
    }
}

impl DataContainer for PartitionedMap {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ContainerKind {
        ContainerKind::PartitionedMap
    }

    fn approximate_size(&self) -> Option<u64> {
        Some(
            self.partitions
                .iter()
                .map(|p| p.load(Ordering::Relaxed))
                .sum(),
        )
    }
}

/// Entry count of a replicated map (the local replica's view).
pub struct ReplicatedMap {
    name: String,
    entries: AtomicU64,
}

impl ReplicatedMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: AtomicU64::new(0),
        }
    }

    pub fn with_entries(self, entries: u64) -> Self {
        self.entries.store(entries, Ordering::Relaxed);
        self
    }

    pub fn record_insert(&self) {
        self.entries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remove(&self) {
        saturating_decrement(&self.entries);
    }

    pub fn clear(&self) {
        self.entries.store(0, Ordering::Relaxed);
    }
}

impl DataContainer for ReplicatedMap {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ContainerKind {
        ContainerKind::ReplicatedMap
    }

    fn approximate_size(&self) -> Option<u64> {
        Some(self.entries.load(Ordering::Relaxed))
    }
}

/// Name → container lookup used when costing scans.
#[derive(Default)]
pub struct ContainerCatalog {
    containers: RwLock<HashMap<String, Arc<dyn DataContainer>>>,
}

impl ContainerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a container under its own name.
    pub fn register(&self, container: Arc<dyn DataContainer>) {
        let mut guard = self.containers.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(container.name().to_string(), container);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn DataContainer>> {
        let guard = self.containers.read().unwrap_or_else(|e| e.into_inner());
        guard
            .get(name)
            .cloned()
            .ok_or_else(|| StatsError::UnknownContainer(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let guard = self.containers.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        names
    }
}
