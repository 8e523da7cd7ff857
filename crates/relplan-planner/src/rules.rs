//! Converter rules and the registry that dispatches them by operator kind.
//!
//! A converter rule rebuilds one node of a given kind in a new convention,
//! converting its inputs first. Rules are plain function pointers with no
//! state, so the search may apply them speculatively and drop the result.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use relplan_core::error::{Error, Result};
use relplan_core::plan::{Convention, OpKind, PlanNode};
use relplan_core::trace::emit_event;

use crate::{logical, physical};

/// Conversion body. Receives the rule itself (for its target convention and
/// mismatch reporting) and the registry (to convert inputs).
pub type ConvertFn = fn(&ConverterRule, &PlanNode, &RuleRegistry) -> Result<PlanNode>;

#[derive(Clone, Copy)]
pub struct ConverterRule {
    pub name: &'static str,
    pub kind: OpKind,
    pub from: Convention,
    pub to: Convention,
    convert: ConvertFn,
}

impl ConverterRule {
    pub const fn new(
        name: &'static str,
        kind: OpKind,
        from: Convention,
        to: Convention,
        convert: ConvertFn,
    ) -> Self {
        Self {
            name,
            kind,
            from,
            to,
            convert,
        }
    }

    pub fn matches(&self, node: &PlanNode) -> bool {
        node.kind() == self.kind && node.convention() == self.from
    }

    /// Error describing `node` being handed to this rule.
    pub fn mismatch(&self, node: &PlanNode) -> Error {
        Error::RuleMismatch {
            rule: self.name,
            kind: node.kind(),
            convention: node.convention(),
        }
    }

    /// Convert `node`. Never mutates it; the result is a new node.
    pub fn apply(&self, node: &PlanNode, registry: &RuleRegistry) -> Result<PlanNode> {
        if !self.matches(node) {
            return Err(self.mismatch(node));
        }
        let converted = (self.convert)(self, node, registry)?;
        if converted.convention() != self.to {
            return Err(Error::Invariant(format!(
                "rule '{}' produced convention {}, expected {}",
                self.name,
                converted.convention(),
                self.to
            )));
        }
        emit_event(
            "rule.fired",
            &[
                ("rule", self.name.to_string()),
                ("kind", self.kind.to_string()),
            ],
        );
        Ok(converted)
    }
}

impl fmt::Debug for ConverterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRule")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

type RuleKey = (OpKind, Convention, Convention);

/// Explicit map from (operator kind, source, target convention) to rules.
/// Several rules may share a key; they are alternatives for the optimizer
/// and the first registered one is used for plain conversion.
#[derive(Debug, Default, Clone)]
pub struct RuleRegistry {
    rules: HashMap<RuleKey, Vec<ConverterRule>>,
}

static DEFAULT_RULES: Lazy<RuleRegistry> = Lazy::new(RuleRegistry::with_default_rules);

/// Registry with every built-in logical and physical rule, built once.
pub fn default_rules() -> &'static RuleRegistry {
    &DEFAULT_RULES
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_rules() -> Self {
        let mut registry = Self::new();
        for rule in logical::RULES.iter().chain(physical::RULES.iter()) {
            registry.register(*rule);
        }
        registry
    }

    pub fn register(&mut self, rule: ConverterRule) {
        self.rules
            .entry((rule.kind, rule.from, rule.to))
            .or_default()
            .push(rule);
    }

    pub fn rules_for(&self, kind: OpKind, from: Convention, to: Convention) -> &[ConverterRule] {
        self.rules
            .get(&(kind, from, to))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Convert a subtree to `target`, one convention step at a time
    /// (NONE → LOGICAL → PHYSICAL). Nodes already at `target` are shared.
    pub fn convert(&self, node: &Arc<PlanNode>, target: Convention) -> Result<Arc<PlanNode>> {
        let mut current = Arc::clone(node);
        while current.convention() != target {
            let next = next_convention(current.convention(), target).ok_or_else(|| {
                Error::Plan(format!(
                    "cannot convert {} node from {} to {}",
                    current.kind(),
                    current.convention(),
                    target
                ))
            })?;
            let rule = self
                .rules_for(current.kind(), current.convention(), next)
                .first()
                .ok_or_else(|| {
                    Error::Plan(format!(
                        "no rule converts {} from {} to {}",
                        current.kind(),
                        current.convention(),
                        next
                    ))
                })?;
            current = Arc::new(rule.apply(&current, self)?);
        }
        Ok(current)
    }

    /// Convert every input of `node` to `target`, preserving order.
    pub fn convert_inputs(&self, node: &PlanNode, target: Convention) -> Result<Vec<Arc<PlanNode>>> {
        node.inputs
            .iter()
            .map(|input| self.convert(input, target))
            .collect()
    }
}

fn next_convention(from: Convention, to: Convention) -> Option<Convention> {
    match (from, to) {
        (Convention::None, Convention::Logical | Convention::Physical) => Some(Convention::Logical),
        (Convention::Logical, Convention::Physical) => Some(Convention::Physical),
        _ => None,
    }
}
