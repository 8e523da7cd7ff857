//! Plan nodes: operator trees tagged with an execution convention.
//!
//! A front end produces a tree of `Convention::None` nodes. Conversion rules
//! (in `relplan-planner`) rebuild it as `Logical`, then `Physical` nodes; the
//! DAG compiler only ever sees the physical form. Nodes are immutable and
//! children are shared through `Arc`, so a rewrite allocates new parents but
//! reuses untouched subtrees.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::schema::Schema;

/// Which execution model a node targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Convention {
    /// Straight from the front end; nothing decided yet.
    None,
    Logical,
    Physical,
}

impl Convention {
    /// Whether a node of this convention may have a child of `child`.
    pub fn accepts_child(self, child: Convention) -> bool {
        match self {
            Convention::None => true,
            other => other == child,
        }
    }
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Convention::None => "NONE",
            Convention::Logical => "LOGICAL",
            Convention::Physical => "PHYSICAL",
        })
    }
}

/// How rows produced by a node are spread across the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Distribution {
    Any,
    /// Spread across members by key (partitioned containers).
    Partitioned,
    /// Gathered on the single member that serves the client.
    Root,
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Distribution::Any => "ANY",
            Distribution::Partitioned => "PARTITIONED",
            Distribution::Root => "ROOT",
        })
    }
}

/// Traits the search substrate uses to bucket equivalent nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitSet {
    pub convention: Convention,
    pub distribution: Distribution,
}

impl TraitSet {
    pub const fn none() -> Self {
        Self {
            convention: Convention::None,
            distribution: Distribution::Any,
        }
    }

    pub fn with_convention(self, convention: Convention) -> Self {
        Self { convention, ..self }
    }

    pub fn with_distribution(self, distribution: Distribution) -> Self {
        Self {
            distribution,
            ..self
        }
    }
}

impl Default for TraitSet {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Display for TraitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.convention, self.distribution)
    }
}

/// Field-less operator tag, used as the rule registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OpKind {
    Scan,
    Filter,
    Project,
    Root,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpKind::Scan => "Scan",
            OpKind::Filter => "Filter",
            OpKind::Project => "Project",
            OpKind::Root => "Root",
        })
    }
}

/// Full scan of a named distributed container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOp {
    pub container: String,
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOp {
    pub predicate: Expr,
}

/// Projection: one expression per output column, plus the declared row type
/// handed down by the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectOp {
    pub exprs: Vec<Expr>,
    pub row_type: Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operator {
    Scan(ScanOp),
    Filter(FilterOp),
    Project(ProjectOp),
    /// Delivers the final rows to the client.
    Root,
}

impl Operator {
    pub fn kind(&self) -> OpKind {
        match self {
            Operator::Scan(_) => OpKind::Scan,
            Operator::Filter(_) => OpKind::Filter,
            Operator::Project(_) => OpKind::Project,
            Operator::Root => OpKind::Root,
        }
    }

    /// Number of inputs the operator requires.
    pub fn arity(&self) -> usize {
        match self {
            Operator::Scan(_) => 0,
            Operator::Filter(_) | Operator::Project(_) | Operator::Root => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub traits: TraitSet,
    pub op: Operator,
    pub inputs: Vec<Arc<PlanNode>>,
}

impl PlanNode {
    /// Build a node, checking arity. Conventions are not checked here since
    /// partially converted trees are legal while the search is running.
    pub fn try_new(traits: TraitSet, op: Operator, inputs: Vec<Arc<PlanNode>>) -> Result<Self> {
        if inputs.len() != op.arity() {
            return Err(Error::Plan(format!(
                "{} expects {} input(s), got {}",
                op.kind(),
                op.arity(),
                inputs.len()
            )));
        }
        Ok(Self { traits, op, inputs })
    }

    pub fn scan(container: impl Into<String>, schema: Schema) -> Arc<Self> {
        Arc::new(Self {
            traits: TraitSet::none(),
            op: Operator::Scan(ScanOp {
                container: container.into(),
                schema,
            }),
            inputs: vec![],
        })
    }

    pub fn filter(input: Arc<PlanNode>, predicate: Expr) -> Arc<Self> {
        Arc::new(Self {
            traits: TraitSet::none(),
            op: Operator::Filter(FilterOp { predicate }),
            inputs: vec![input],
        })
    }

    pub fn project(input: Arc<PlanNode>, exprs: Vec<Expr>, row_type: Schema) -> Arc<Self> {
        Arc::new(Self {
            traits: TraitSet::none(),
            op: Operator::Project(ProjectOp { exprs, row_type }),
            inputs: vec![input],
        })
    }

    pub fn root(input: Arc<PlanNode>) -> Arc<Self> {
        Arc::new(Self {
            traits: TraitSet::none(),
            op: Operator::Root,
            inputs: vec![input],
        })
    }

    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }

    pub fn convention(&self) -> Convention {
        self.traits.convention
    }

    pub fn is_physical(&self) -> bool {
        self.traits.convention == Convention::Physical
    }

    /// Single input of a unary node.
    pub fn input(&self) -> Result<&Arc<PlanNode>> {
        match self.inputs.as_slice() {
            [only] => Ok(only),
            other => Err(Error::Plan(format!(
                "{} node has {} inputs, expected 1",
                self.kind(),
                other.len()
            ))),
        }
    }

    /// Declared output row type. Filter and root pass their input through,
    /// project reports what the front end declared.
    pub fn row_type(&self) -> Result<Schema> {
        match &self.op {
            Operator::Scan(scan) => Ok(scan.schema.clone()),
            Operator::Project(project) => Ok(project.row_type.clone()),
            Operator::Filter(_) | Operator::Root => self.input()?.row_type(),
        }
    }

    /// Number of nodes in the subtree rooted here.
    pub fn node_count(&self) -> usize {
        1 + self.inputs.iter().map(|i| i.node_count()).sum::<usize>()
    }
}

/// Check that every converted node only has children of its own convention.
pub fn validate_conventions(node: &PlanNode) -> Result<()> {
    for child in &node.inputs {
        if !node.convention().accepts_child(child.convention()) {
            return Err(Error::Invariant(format!(
                "{} node with convention {} has {} child with convention {}",
                node.kind(),
                node.convention(),
                child.kind(),
                child.convention()
            )));
        }
        validate_conventions(child)?;
    }
    Ok(())
}
