//! Human-readable plan descriptions.

use std::fmt::{self, Write as _};

use relplan_core::error::{Error, Result};
use relplan_core::plan::{Convention, Operator, PlanNode};

use crate::cost::compute_self_cost;
use crate::metadata::MetadataQuery;

/// Operator name plus ordered key/value pairs, as consumed by a search
/// substrate's digest and by `explain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainTerms {
    pub name: String,
    pub items: Vec<(String, String)>,
}

impl ExplainTerms {
    fn item(&mut self, key: impl Into<String>, value: impl ToString) {
        self.items.push((key.into(), value.to_string()));
    }
}

impl fmt::Display for ExplainTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.items.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, (k, v)) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str(")")
    }
}

pub fn explain_terms(node: &PlanNode) -> ExplainTerms {
    let suffix = match node.convention() {
        Convention::None => "",
        Convention::Logical => "Logical",
        Convention::Physical => "Physical",
    };
    let mut terms = ExplainTerms {
        name: format!("{}{suffix}", node.kind()),
        items: Vec::new(),
    };
    match &node.op {
        Operator::Scan(scan) => {
            terms.item("table", &scan.container);
        }
        Operator::Filter(filter) => {
            terms.item("condition", &filter.predicate);
        }
        Operator::Project(project) => {
            for (i, expr) in project.exprs.iter().enumerate() {
                let name = project
                    .row_type
                    .field(i)
                    .map(|f| f.name.clone())
                    .unwrap_or_else(|| format!("EXPR${i}"));
                terms.item(name, expr);
            }
        }
        Operator::Root => {}
    }
    if node.is_physical() {
        terms.item("distribution", node.traits.distribution);
    }
    terms
}

/// Indented tree, one node per line. With a metadata query every line also
/// carries the node's self cost, which requires a fully physical plan.
pub fn explain(
    node: &PlanNode,
    costing: Option<&dyn MetadataQuery>,
) -> Result<String> {
    let mut out = String::new();
    write_node(node, costing, 0, &mut out)?;
    Ok(out)
}

fn write_node(
    node: &PlanNode,
    costing: Option<&dyn MetadataQuery>,
    depth: usize,
    out: &mut String,
) -> Result<()> {
    let fmt_err = |e: fmt::Error| Error::Invariant(e.to_string());
    write!(out, "{:indent$}{}", "", explain_terms(node), indent = depth * 2).map_err(fmt_err)?;
    if let Some(mq) = costing {
        let cost = compute_self_cost(node, mq)?;
        write!(out, ": {cost}").map_err(fmt_err)?;
    }
    out.push('\n');
    for input in &node.inputs {
        write_node(input, costing, depth + 1, out)?;
    }
    Ok(())
}
