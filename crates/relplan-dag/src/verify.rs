//! Debug-time verification helpers for compiled graphs.
//!
//! Intended for tests and debug builds; they panic with a description of
//! the first violation found.

use std::collections::{HashMap, HashSet};

use relplan_core::id::VertexId;

use crate::graph::Dag;

/// Every edge goes from a vertex listed earlier to one listed later.
pub fn assert_topological(dag: &Dag) {
    let mut seen = HashSet::<VertexId>::new();
    for v in dag.vertices() {
        for e in dag.inputs_of(v.id) {
            assert!(
                seen.contains(&e.from),
                "input {} of vertex {} not emitted before it",
                e.from,
                v.id
            );
        }
        seen.insert(v.id);
    }
}

/// The graph mirrors a tree: one sink, every other vertex feeds exactly one
/// parent, and each vertex's input slots are numbered `0..n` without gaps.
pub fn assert_tree_shaped(dag: &Dag) {
    let sinks = dag.sinks();
    assert_eq!(sinks.len(), 1, "expected one sink, found {}", sinks.len());

    let mut fan_out = HashMap::<VertexId, usize>::new();
    for e in dag.edges() {
        *fan_out.entry(e.from).or_default() += 1;
    }
    for (id, n) in fan_out {
        assert_eq!(n, 1, "vertex {id} feeds {n} parents");
    }

    for v in dag.vertices() {
        for (slot, e) in dag.inputs_of(v.id).iter().enumerate() {
            assert_eq!(e.ordinal, slot, "vertex {} has a gap in its input slots", v.id);
        }
    }
}
