#![forbid(unsafe_code)]
//! relplan-dag: physical plan → execution graph.
//!
//! - `vertex` describes what runs at each vertex (`ProcessorSpec`)
//! - `graph` holds the immutable `Dag` and the `DagBuilder` that produces it
//! - `compiler` walks a physical plan through the planner's
//!   `CreateDagVisitor` and wires one vertex per operator (or fused pair)
//! - `verify` has cheap structural checks for tests and debug builds

pub mod compiler;
pub mod error;
pub mod graph;
pub mod verify;
pub mod vertex;

pub use compiler::{compile_dag, DagCompiler};
pub use error::{DagError, Result};
pub use graph::{Dag, DagBuilder, Edge, Routing};
pub use verify::{assert_topological, assert_tree_shaped};
pub use vertex::{ProcessorSpec, Vertex};
