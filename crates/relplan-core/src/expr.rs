//! Typed expression tree carried by filter predicates and project lists.
//!
//! Column references are positional (index into the input row), the way a
//! bound relational expression addresses its input. Types are derived from
//! the input schema, never stored.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{DataType, Schema};
use crate::types::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Reference to input column `0..n`.
    Column(usize),
    Literal(Scalar),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Arithmetic {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
}

impl Expr {
    pub fn column(index: usize) -> Self {
        Expr::Column(index)
    }

    pub fn literal(value: Scalar) -> Self {
        Expr::Literal(value)
    }

    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn arithmetic(op: ArithOp, left: Expr, right: Expr) -> Self {
        Expr::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Result type of this expression over rows of `input`.
    pub fn data_type(&self, input: &Schema) -> Result<DataType> {
        match self {
            Expr::Column(idx) => input
                .field(*idx)
                .map(|f| f.data_type)
                .ok_or_else(|| {
                    Error::Schema(format!(
                        "column ${idx} out of range for input of {} columns",
                        input.len()
                    ))
                }),
            Expr::Literal(v) => Ok(v.data_type()),
            Expr::Arithmetic { op, left, right } => {
                let (l, r) = (left.data_type(input)?, right.data_type(input)?);
                let numeric = |t: DataType| t.is_numeric() || t == DataType::Null;
                if !numeric(l) || !numeric(r) {
                    return Err(Error::Schema(format!(
                        "operator {} expects numeric operands, got {l} and {r}",
                        op.symbol()
                    )));
                }
                Ok(l.widen(r))
            }
            Expr::Compare { left, right, .. } => {
                left.data_type(input)?;
                right.data_type(input)?;
                Ok(DataType::Boolean)
            }
            Expr::And(items) | Expr::Or(items) => {
                for item in items {
                    item.data_type(input)?;
                }
                Ok(DataType::Boolean)
            }
            Expr::Not(inner) | Expr::IsNull(inner) | Expr::IsNotNull(inner) => {
                inner.data_type(input)?;
                Ok(DataType::Boolean)
            }
        }
    }

    /// Whether the expression may produce NULL over rows of `input`.
    pub fn nullable(&self, input: &Schema) -> bool {
        match self {
            Expr::Column(idx) => input.field(*idx).map(|f| f.nullable).unwrap_or(true),
            Expr::Literal(v) => v.is_null(),
            Expr::Compare { left, right, .. } | Expr::Arithmetic { left, right, .. } => {
                left.nullable(input) || right.nullable(input)
            }
            Expr::And(items) | Expr::Or(items) => items.iter().any(|e| e.nullable(input)),
            Expr::Not(inner) => inner.nullable(input),
            Expr::IsNull(_) | Expr::IsNotNull(_) => false,
        }
    }

    /// Input columns referenced anywhere in the tree, in first-seen order.
    pub fn referenced_columns(&self) -> Vec<usize> {
        fn walk(e: &Expr, out: &mut Vec<usize>) {
            match e {
                Expr::Column(i) => {
                    if !out.contains(i) {
                        out.push(*i);
                    }
                }
                Expr::Literal(_) => {}
                Expr::Compare { left, right, .. } | Expr::Arithmetic { left, right, .. } => {
                    walk(left, out);
                    walk(right, out);
                }
                Expr::And(items) | Expr::Or(items) => items.iter().for_each(|i| walk(i, out)),
                Expr::Not(inner) | Expr::IsNull(inner) | Expr::IsNotNull(inner) => {
                    walk(inner, out)
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    /// Evaluate against one input row (SQL three-valued logic).
    pub fn eval(&self, row: &[Scalar]) -> Result<Scalar> {
        match self {
            Expr::Column(idx) => row
                .get(*idx)
                .cloned()
                .ok_or_else(|| Error::Eval(format!("column ${idx} missing from row"))),
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Compare { op, left, right } => {
                let (l, r) = (left.eval(row)?, right.eval(row)?);
                if l.is_null() || r.is_null() {
                    return Ok(Scalar::Null);
                }
                let ord = l.sql_cmp(&r).ok_or_else(|| {
                    Error::Eval(format!(
                        "cannot compare {} with {}",
                        l.data_type(),
                        r.data_type()
                    ))
                })?;
                let res = match op {
                    CompareOp::Eq => ord.is_eq(),
                    CompareOp::NotEq => ord.is_ne(),
                    CompareOp::Lt => ord.is_lt(),
                    CompareOp::LtEq => ord.is_le(),
                    CompareOp::Gt => ord.is_gt(),
                    CompareOp::GtEq => ord.is_ge(),
                };
                Ok(Scalar::Bool(res))
            }
            Expr::Arithmetic { op, left, right } => {
                eval_arithmetic(*op, &left.eval(row)?, &right.eval(row)?)
            }
            Expr::And(items) => {
                let mut saw_null = false;
                for item in items {
                    match item.eval(row)? {
                        Scalar::Bool(false) => return Ok(Scalar::Bool(false)),
                        Scalar::Bool(true) => {}
                        Scalar::Null => saw_null = true,
                        other => return Err(not_boolean(&other)),
                    }
                }
                Ok(if saw_null { Scalar::Null } else { Scalar::Bool(true) })
            }
            Expr::Or(items) => {
                let mut saw_null = false;
                for item in items {
                    match item.eval(row)? {
                        Scalar::Bool(true) => return Ok(Scalar::Bool(true)),
                        Scalar::Bool(false) => {}
                        Scalar::Null => saw_null = true,
                        other => return Err(not_boolean(&other)),
                    }
                }
                Ok(if saw_null { Scalar::Null } else { Scalar::Bool(false) })
            }
            Expr::Not(inner) => match inner.eval(row)? {
                Scalar::Bool(b) => Ok(Scalar::Bool(!b)),
                Scalar::Null => Ok(Scalar::Null),
                other => Err(not_boolean(&other)),
            },
            Expr::IsNull(inner) => Ok(Scalar::Bool(inner.eval(row)?.is_null())),
            Expr::IsNotNull(inner) => Ok(Scalar::Bool(!inner.eval(row)?.is_null())),
        }
    }

    /// Predicate form of `eval`: NULL counts as "not retained".
    pub fn eval_predicate(&self, row: &[Scalar]) -> Result<bool> {
        match self.eval(row)? {
            Scalar::Bool(b) => Ok(b),
            Scalar::Null => Ok(false),
            other => Err(not_boolean(&other)),
        }
    }
}

fn not_boolean(v: &Scalar) -> Error {
    Error::Eval(format!("expected BOOLEAN, got {}", v.data_type()))
}

fn eval_arithmetic(op: ArithOp, l: &Scalar, r: &Scalar) -> Result<Scalar> {
    if l.is_null() || r.is_null() {
        return Ok(Scalar::Null);
    }
    let result_type = l.data_type().widen(r.data_type());
    if let (Some(a), Some(b)) = (l.as_i64(), r.as_i64()) {
        let v = match op {
            ArithOp::Add => a.checked_add(b),
            ArithOp::Sub => a.checked_sub(b),
            ArithOp::Mul => a.checked_mul(b),
            ArithOp::Div => {
                if b == 0 {
                    return Err(Error::Eval("division by zero".into()));
                }
                a.checked_div(b)
            }
        }
        .ok_or_else(|| Error::Eval(format!("integer overflow in {a} {} {b}", op.symbol())))?;
        return match result_type {
            DataType::Int32 => i32::try_from(v)
                .map(Scalar::I32)
                .map_err(|_| Error::Eval(format!("value {v} overflows INTEGER"))),
            _ => Ok(Scalar::I64(v)),
        };
    }
    let (a, b) = match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(Error::Eval(format!(
                "operator {} expects numeric operands, got {} and {}",
                op.symbol(),
                l.data_type(),
                r.data_type()
            )))
        }
    };
    let v = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
    };
    Ok(match result_type {
        DataType::Float32 => Scalar::F32(v as f32),
        _ => Scalar::F64(v),
    })
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{item}")?;
            }
            f.write_str(")")
        }
        match self {
            Expr::Column(i) => write!(f, "${i}"),
            Expr::Literal(Scalar::Str(s)) => write!(f, "'{s}'"),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Compare { op, left, right } => write!(f, "{left} {} {right}", op.symbol()),
            Expr::Arithmetic { op, left, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
            Expr::And(items) => join(f, items, " AND "),
            Expr::Or(items) => join(f, items, " OR "),
            Expr::Not(inner) => write!(f, "NOT ({inner})"),
            Expr::IsNull(inner) => write!(f, "{inner} IS NULL"),
            Expr::IsNotNull(inner) => write!(f, "{inner} IS NOT NULL"),
        }
    }
}
