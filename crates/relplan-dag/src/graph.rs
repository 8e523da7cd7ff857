//! The execution graph handed to the runtime.
//!
//! A `Dag` is built once through `DagBuilder` and never changes afterwards.
//! Vertices are stored in creation order; the compiler creates children
//! before parents, so that order is already topological.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use relplan_core::hash::{hash_serde, Hash256};
use relplan_core::id::{DagId, EdgeId, VertexId};
use relplan_core::plan::Distribution;
use relplan_core::schema::Schema;

use crate::error::{DagError, Result};
use crate::vertex::{ProcessorSpec, Vertex};

/// How rows travel along an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Routing {
    /// Stay on the member that produced them.
    Local,
    /// Every member sends to the single member running the target.
    AllToOne,
}

impl fmt::Display for Routing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Routing::Local => "local",
            Routing::AllToOne => "all_to_one",
        })
    }
}

/// Directed edge `from → to`. `ordinal` is the input slot at `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: VertexId,
    pub to: VertexId,
    pub ordinal: usize,
    pub routing: Routing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dag {
    id: DagId,
    version: String,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
}

impl Dag {
    pub fn id(&self) -> DagId {
        self.id
    }

    /// Planner version that produced this graph.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Vertices in topological (creation) order.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.iter().find(|v| v.id == id)
    }

    /// Incoming edges of `id`, ordered by input slot.
    pub fn inputs_of(&self, id: VertexId) -> Vec<&Edge> {
        let mut inputs: Vec<&Edge> = self.edges.iter().filter(|e| e.to == id).collect();
        inputs.sort_by_key(|e| e.ordinal);
        inputs
    }

    pub fn outputs_of(&self, id: VertexId) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.from == id).collect()
    }

    /// Vertices with no inputs.
    pub fn sources(&self) -> Vec<&Vertex> {
        self.vertices
            .iter()
            .filter(|v| !self.edges.iter().any(|e| e.to == v.id))
            .collect()
    }

    /// Vertices with no outputs.
    pub fn sinks(&self) -> Vec<&Vertex> {
        self.vertices
            .iter()
            .filter(|v| !self.edges.iter().any(|e| e.from == v.id))
            .collect()
    }

    /// Stable digest of the graph shape and payloads. Ignores the random id,
    /// so two compilations of the same plan share a fingerprint.
    pub fn fingerprint(&self) -> Result<Hash256> {
        Ok(hash_serde(&(&self.version, &self.vertices, &self.edges))?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for Dag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dag {} (v{})", self.id, self.version)?;
        for v in &self.vertices {
            write!(f, "  {} {} [{}]", v.id.get(), v.name, v.distribution)?;
            if let Some(p) = v.local_parallelism {
                write!(f, " x{p}")?;
            }
            writeln!(f)?;
        }
        for e in &self.edges {
            writeln!(
                f,
                "  {} -> {} #{} {}",
                e.from.get(),
                e.to.get(),
                e.ordinal,
                e.routing
            )?;
        }
        Ok(())
    }
}

/// Accumulates vertices and edges, then freezes them into a `Dag`.
#[derive(Debug, Default)]
pub struct DagBuilder {
    vertices: Vec<Vertex>,
    index: HashMap<VertexId, usize>,
    edges: Vec<Edge>,
    next_vertex: u64,
    next_edge: u64,
}

impl DagBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(
        &mut self,
        name: impl Into<String>,
        processor: ProcessorSpec,
        schema: Schema,
        distribution: Distribution,
        local_parallelism: Option<u32>,
    ) -> VertexId {
        let id = VertexId::new(self.next_vertex);
        self.next_vertex += 1;
        self.index.insert(id, self.vertices.len());
        self.vertices.push(Vertex {
            id,
            name: name.into(),
            local_parallelism,
            distribution,
            schema,
            processor,
        });
        id
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.index.get(&id).map(|&i| &self.vertices[i])
    }

    /// Mutable access before the graph is frozen (used for fusion).
    pub fn vertex_mut(&mut self, id: VertexId) -> Result<&mut Vertex> {
        let i = *self.index.get(&id).ok_or(DagError::UnknownVertex(id))?;
        Ok(&mut self.vertices[i])
    }

    pub fn add_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        ordinal: usize,
        routing: Routing,
    ) -> Result<EdgeId> {
        for v in [from, to] {
            if !self.index.contains_key(&v) {
                return Err(DagError::UnknownVertex(v));
            }
        }
        if from == to {
            return Err(DagError::Malformed(format!("self-loop on {from}")));
        }
        if self.edges.iter().any(|e| e.to == to && e.ordinal == ordinal) {
            return Err(DagError::Malformed(format!(
                "input slot {ordinal} of {to} is already wired"
            )));
        }
        let id = EdgeId::new(self.next_edge);
        self.next_edge += 1;
        self.edges.push(Edge {
            id,
            from,
            to,
            ordinal,
            routing,
        });
        Ok(id)
    }

    /// Freeze the graph. Every edge must point forward in creation order,
    /// which also rules out cycles.
    pub fn build(self) -> Result<Dag> {
        for e in &self.edges {
            let position = |id: VertexId| self.index.get(&id).copied().ok_or(DagError::UnknownVertex(id));
            if position(e.from)? >= position(e.to)? {
                return Err(DagError::Malformed(format!(
                    "edge {} -> {} points backwards",
                    e.from, e.to
                )));
            }
        }
        Ok(Dag {
            id: DagId::new_random(),
            version: relplan_core::VERSION.to_string(),
            vertices: self.vertices,
            edges: self.edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(b: &mut DagBuilder, name: &str) -> VertexId {
        b.add_vertex(
            name,
            ProcessorSpec::Root,
            Schema::default(),
            Distribution::Any,
            None,
        )
    }

    #[test]
    fn edges_must_point_forward() {
        let mut b = DagBuilder::new();
        let a = vertex(&mut b, "a");
        let c = vertex(&mut b, "c");
        b.add_edge(c, a, 0, Routing::Local).unwrap();
        assert!(matches!(b.build(), Err(DagError::Malformed(_))));
    }

    #[test]
    fn input_slots_are_unique() {
        let mut b = DagBuilder::new();
        let a = vertex(&mut b, "a");
        let x = vertex(&mut b, "x");
        let c = vertex(&mut b, "c");
        b.add_edge(a, c, 0, Routing::Local).unwrap();
        assert!(b.add_edge(x, c, 0, Routing::Local).is_err());
        b.add_edge(x, c, 1, Routing::Local).unwrap();
        let dag = b.build().unwrap();
        let inputs: Vec<VertexId> = dag.inputs_of(c).iter().map(|e| e.from).collect();
        assert_eq!(inputs, vec![a, x]);
        assert_eq!(dag.sources().len(), 2);
        assert_eq!(dag.sinks().len(), 1);
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let mut b = DagBuilder::new();
        let a = vertex(&mut b, "a");
        let err = b.add_edge(a, VertexId::new(99), 0, Routing::Local).unwrap_err();
        assert!(matches!(err, DagError::UnknownVertex(_)));
        assert!(b.add_edge(a, a, 0, Routing::Local).is_err());
    }

    #[test]
    fn fingerprint_ignores_random_id() {
        let build = || {
            let mut b = DagBuilder::new();
            let a = vertex(&mut b, "a");
            let c = vertex(&mut b, "c");
            b.add_edge(a, c, 0, Routing::AllToOne).unwrap();
            b.build().unwrap()
        };
        let (x, y) = (build(), build());
        assert_ne!(x.id(), y.id());
        assert_eq!(x.fingerprint().unwrap(), y.fingerprint().unwrap());
    }
}
