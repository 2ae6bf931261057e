//! Condition expression tree
//!
//! A parsed rule condition is a tree of [`Expr`] nodes: atoms comparing
//! one field against a literal, combined with NOT/AND/OR and grouping.
//! Evaluation semantics, including the treatment of absent fields, live
//! in [`eval`].

use crate::event::FieldPath;
use crate::pattern::{LikePattern, WildcardPattern};

mod eval;

/// A parsed condition expression
#[derive(Debug, Clone)]
pub enum Expr {
    /// A single field predicate
    Atom(Predicate),
    /// Logical negation
    Not(Box<Expr>),
    /// Conjunction; all children must match
    And(Vec<Expr>),
    /// Disjunction; at least one child must match
    Or(Vec<Expr>),
}

impl Expr {
    /// Flatten nested same-kind nodes: `And(a, And(b, c))` becomes
    /// `And(a, b, c)`.
    pub(crate) fn and(mut children: Vec<Expr>) -> Expr {
        if children.len() == 1 {
            return children.remove(0);
        }
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Expr::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        Expr::And(flat)
    }

    /// Counterpart of [`Expr::and`] for disjunctions
    pub(crate) fn or(mut children: Vec<Expr>) -> Expr {
        if children.len() == 1 {
            return children.remove(0);
        }
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Expr::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        Expr::Or(flat)
    }
}

/// One field-against-literal test
#[derive(Debug, Clone)]
pub struct Predicate {
    /// The field path on the left-hand side
    pub path: FieldPath,
    /// The operator and its right-hand side
    pub op: Op,
}

/// Operators supported in atoms.
///
/// The negated variants are distinct operators rather than sugar for
/// `NOT`: on a record where the field is absent they evaluate to
/// `false`, while a wrapping `NOT` would flip that to `true`.
#[derive(Debug, Clone)]
pub enum Op {
    /// `=`
    Eq(Literal),
    /// `!=` / `<>`
    Neq(Literal),
    /// `<`
    Lt(Literal),
    /// `<=`
    Lte(Literal),
    /// `>`
    Gt(Literal),
    /// `>=`
    Gte(Literal),
    /// `IN (a, b, c)`
    In(Vec<Literal>),
    /// `NOT IN (a, b, c)`
    NotIn(Vec<Literal>),
    /// `CONTAINS 'text'`
    Contains(String),
    /// `NOT CONTAINS 'text'`
    NotContains(String),
    /// `STARTSWITH 'text'`
    StartsWith(String),
    /// `NOT STARTSWITH 'text'`
    NotStartsWith(String),
    /// `ENDSWITH 'text'`
    EndsWith(String),
    /// `NOT ENDSWITH 'text'`
    NotEndsWith(String),
    /// `MATCH 'pat*'`
    Match(WildcardPattern),
    /// `LIKE 'pat%'`
    Like(LikePattern),
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
}

/// A literal on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Single-quoted string
    Str(String),
    /// Bare number
    Num(f64),
    /// `true` / `false`
    Bool(bool),
}

impl Literal {
    /// Numeric view of the literal, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Num(n) => Some(*n),
            Literal::Str(s) => s.parse().ok(),
            Literal::Bool(_) => None,
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Num(n) => write!(f, "{}", n),
            Literal::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Atom(p) => write!(f, "{}", p),
            Expr::Not(inner) => write!(f, "NOT {}", inner),
            Expr::And(children) => {
                let parts: Vec<String> = children.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(" AND "))
            }
            Expr::Or(children) => {
                let parts: Vec<String> = children.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(" OR "))
            }
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = &self.path;
        match &self.op {
            Op::Eq(l) => write!(f, "{} = {}", path, l),
            Op::Neq(l) => write!(f, "{} != {}", path, l),
            Op::Lt(l) => write!(f, "{} < {}", path, l),
            Op::Lte(l) => write!(f, "{} <= {}", path, l),
            Op::Gt(l) => write!(f, "{} > {}", path, l),
            Op::Gte(l) => write!(f, "{} >= {}", path, l),
            Op::In(list) => write!(f, "{} IN ({})", path, join(list)),
            Op::NotIn(list) => write!(f, "{} NOT IN ({})", path, join(list)),
            Op::Contains(s) => write!(f, "{} CONTAINS '{}'", path, s),
            Op::NotContains(s) => write!(f, "{} NOT CONTAINS '{}'", path, s),
            Op::StartsWith(s) => write!(f, "{} STARTSWITH '{}'", path, s),
            Op::NotStartsWith(s) => write!(f, "{} NOT STARTSWITH '{}'", path, s),
            Op::EndsWith(s) => write!(f, "{} ENDSWITH '{}'", path, s),
            Op::NotEndsWith(s) => write!(f, "{} NOT ENDSWITH '{}'", path, s),
            Op::Match(_) => write!(f, "{} MATCH", path),
            Op::Like(_) => write!(f, "{} LIKE", path),
            Op::IsNull => write!(f, "{} IS NULL", path),
            Op::IsNotNull => write!(f, "{} IS NOT NULL", path),
        }
    }
}

fn join(list: &[Literal]) -> String {
    list.iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
