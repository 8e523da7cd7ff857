//! Physical plan → `Dag`.
//!
//! One depth-first, children-first walk through `relplan_planner::accept`.
//! Every physical node becomes one vertex wired to its inputs' vertices in
//! input order, except that with `fuse_operators` a project sitting directly
//! on a filter is folded into the filter's vertex as a single `Calc`.

use relplan_core::config::PlannerConfig;
use relplan_core::error::{Error, Result as PlanResult};
use relplan_core::expr::Expr;
use relplan_core::id::VertexId;
use relplan_core::plan::{
    validate_conventions, Distribution, FilterOp, OpKind, PlanNode, ProjectOp, ScanOp,
};
use relplan_core::trace::emit_event;
use relplan_planner::physical::{filter_predicate, projection};
use relplan_planner::{accept, schema, CreateDagVisitor};

use crate::error::{DagError, Result};
use crate::graph::{Dag, DagBuilder, Routing};
use crate::vertex::ProcessorSpec;

pub struct DagCompiler<'c> {
    builder: DagBuilder,
    config: &'c PlannerConfig,
}

fn graph_error(e: DagError) -> Error {
    match e {
        DagError::Plan(inner) => inner,
        other => Error::Invariant(other.to_string()),
    }
}

/// Rows leave the cluster-wide layout only when a gathering parent reads a
/// child that is spread out.
fn routing(parent: Distribution, child: Distribution) -> Routing {
    if parent == Distribution::Root && child != Distribution::Root {
        Routing::AllToOne
    } else {
        Routing::Local
    }
}

impl<'c> DagCompiler<'c> {
    pub fn new(config: &'c PlannerConfig) -> Self {
        Self {
            builder: DagBuilder::new(),
            config,
        }
    }

    pub fn finish(self) -> Result<Dag> {
        self.builder.build()
    }

    fn add_vertex(
        &mut self,
        node: &PlanNode,
        name: String,
        processor: ProcessorSpec,
    ) -> PlanResult<VertexId> {
        let id = self.builder.add_vertex(
            name,
            processor,
            schema(node)?,
            node.traits.distribution,
            self.config.local_parallelism,
        );
        emit_event(
            "dag.vertex",
            &[("id", id.get().to_string()), ("kind", node.kind().to_string())],
        );
        Ok(id)
    }

    /// Wire `inputs` into `to` in order; the position is the input slot.
    fn connect(&mut self, node: &PlanNode, inputs: &[VertexId], to: VertexId) -> PlanResult<()> {
        for (ordinal, &from) in inputs.iter().enumerate() {
            let child = self
                .builder
                .vertex(from)
                .map(|v| v.distribution)
                .ok_or_else(|| graph_error(DagError::UnknownVertex(from)))?;
            self.builder
                .add_edge(from, to, ordinal, routing(node.traits.distribution, child))
                .map_err(graph_error)?;
        }
        Ok(())
    }

    /// Turn the filter vertex `input` into a calc vertex computing `exprs`.
    /// Returns false (and changes nothing) if `input` is not a filter.
    fn fuse_into_filter(
        &mut self,
        node: &PlanNode,
        input: VertexId,
        exprs: Vec<Expr>,
    ) -> PlanResult<bool> {
        let out_schema = schema(node)?;
        let vertex = self.builder.vertex_mut(input).map_err(graph_error)?;
        let ProcessorSpec::Filter { predicate } = &vertex.processor else {
            return Ok(false);
        };
        vertex.processor = ProcessorSpec::Calc {
            predicate: predicate.clone(),
            exprs,
        };
        vertex.name = "calc".to_string();
        vertex.schema = out_schema;
        vertex.distribution = node.traits.distribution;
        emit_event("dag.fused", &[("vertex", input.get().to_string())]);
        Ok(true)
    }
}

impl CreateDagVisitor for DagCompiler<'_> {
    type Output = VertexId;

    fn on_scan(&mut self, node: &PlanNode, scan: &ScanOp) -> PlanResult<VertexId> {
        self.add_vertex(
            node,
            format!("scan({})", scan.container),
            ProcessorSpec::Scan {
                container: scan.container.clone(),
            },
        )
    }

    fn on_filter(&mut self, node: &PlanNode, filter: &FilterOp, input: VertexId) -> PlanResult<VertexId> {
        let input_schema = schema(node.input()?)?;
        let predicate = filter_predicate(filter, &input_schema)?.clone();
        let id = self.add_vertex(node, "filter".to_string(), ProcessorSpec::Filter { predicate })?;
        self.connect(node, &[input], id)?;
        Ok(id)
    }

    fn on_project(
        &mut self,
        node: &PlanNode,
        project: &ProjectOp,
        input: VertexId,
    ) -> PlanResult<VertexId> {
        let child = node.input()?;
        let exprs = projection(project, &schema(child)?)?.to_vec();
        if self.config.fuse_operators
            && child.kind() == OpKind::Filter
            && self.fuse_into_filter(node, input, exprs.clone())?
        {
            return Ok(input);
        }
        let id = self.add_vertex(node, "project".to_string(), ProcessorSpec::Project { exprs })?;
        self.connect(node, &[input], id)?;
        Ok(id)
    }

    fn on_root(&mut self, node: &PlanNode, input: VertexId) -> PlanResult<VertexId> {
        let id = self.add_vertex(node, "root".to_string(), ProcessorSpec::Root)?;
        self.connect(node, &[input], id)?;
        Ok(id)
    }
}

/// Compile a fully physical plan. Any non-physical node aborts the whole
/// pass before a graph is produced.
pub fn compile_dag(root: &PlanNode, config: &PlannerConfig) -> Result<Dag> {
    if !root.is_physical() {
        return Err(Error::NotPhysical {
            kind: root.kind(),
            convention: root.convention(),
        }
        .into());
    }
    validate_conventions(root)?;

    let mut compiler = DagCompiler::new(config);
    accept(root, &mut compiler)?;
    let dag = compiler.finish()?;
    emit_event(
        "dag.done",
        &[
            ("vertices", dag.vertices().len().to_string()),
            ("edges", dag.edges().len().to_string()),
        ],
    );
    Ok(dag)
}
