//! Row evaluation for the emulator's SQL dialect.
//!
//! Expressions evaluate to an optional BSON value. `None` is the query language's
//! `undefined`: a missing property, a comparison between values of different types,
//! or a function applied to the wrong kinds of arguments. A row matches a `WHERE`
//! clause only when the clause evaluates to `true`.

use std::{cmp::Ordering, collections::HashMap, mem::discriminant};

use bson::{Bson, Document, datetime::DateTime};

use crate::sql::{CompareOp, Function, SqlExpr};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to `f64`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl Comparable<'_> {
    /// Position of this value's type in the cross-type sort order.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 1,
            Comparable::Bool(_) => 2,
            Comparable::Number(_) => 3,
            Comparable::DateTime(_) => 4,
            Comparable::String(_) => 5,
            Comparable::Array(_) => 6,
            Comparable::Map(_) => 7,
        }
    }

    fn same_type(&self, other: &Self) -> bool {
        discriminant(self) == discriminant(other)
    }
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(values) => Comparable::Array(values.iter().map(Comparable::from).collect()),
            Bson::Document(document) => Comparable::Map(
                document
                    .iter()
                    .map(|(key, value)| (key.as_str(), Comparable::from(value)))
                    .collect(),
            ),
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Orders two possibly-undefined values for `ORDER BY`.
///
/// Undefined sorts first, then values by type (null, booleans, numbers, dates,
/// strings, arrays, objects), then by value within a type.
pub(crate) fn sort_order(left: Option<&Bson>, right: Option<&Bson>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => {
            let (left, right) = (Comparable::from(left), Comparable::from(right));

            left.type_rank()
                .cmp(&right.type_rank())
                .then_with(|| left.partial_cmp(&right).unwrap_or(Ordering::Equal))
        }
    }
}

/// Evaluates expressions against one stored row.
pub(crate) struct RowEvaluator<'a> {
    row: &'a Document,
}

impl<'a> RowEvaluator<'a> {
    pub fn new(row: &'a Document) -> Self {
        Self { row }
    }

    /// Whether the row satisfies `filter`.
    pub fn matches(&self, filter: &SqlExpr) -> bool {
        matches!(self.evaluate(filter), Some(Bson::Boolean(true)))
    }

    /// Looks up a property path. An empty path is not addressable here.
    pub fn resolve(&self, path: &[String]) -> Option<&'a Bson> {
        let (first, rest) = path.split_first()?;
        let mut current = self.row.get(first)?;

        for segment in rest {
            current = match current {
                Bson::Document(document) => document.get(segment)?,
                Bson::Array(values) => values.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }

    fn evaluate(&self, expr: &SqlExpr) -> Option<Bson> {
        match expr {
            SqlExpr::Path(path) if path.is_empty() => Some(Bson::Document(self.row.clone())),
            SqlExpr::Path(path) => self.resolve(path).cloned(),
            SqlExpr::Literal(value) => Some(value.clone()),
            SqlExpr::Compare(op, left, right) => {
                let (left, right) = (self.evaluate(left)?, self.evaluate(right)?);
                compare(*op, &left, &right).map(Bson::Boolean)
            }
            SqlExpr::Not(inner) => match self.evaluate(inner)? {
                Bson::Boolean(value) => Some(Bson::Boolean(!value)),
                _ => None,
            },
            SqlExpr::And(left, right) => {
                match (self.evaluate_bool(left), self.evaluate_bool(right)) {
                    (Some(false), _) | (_, Some(false)) => Some(Bson::Boolean(false)),
                    (Some(true), Some(true)) => Some(Bson::Boolean(true)),
                    _ => None,
                }
            }
            SqlExpr::Or(left, right) => {
                match (self.evaluate_bool(left), self.evaluate_bool(right)) {
                    (Some(true), _) | (_, Some(true)) => Some(Bson::Boolean(true)),
                    (Some(false), Some(false)) => Some(Bson::Boolean(false)),
                    _ => None,
                }
            }
            SqlExpr::Call(function, args) => self.call(*function, args),
        }
    }

    fn evaluate_bool(&self, expr: &SqlExpr) -> Option<bool> {
        match self.evaluate(expr)? {
            Bson::Boolean(value) => Some(value),
            _ => None,
        }
    }

    fn call(&self, function: Function, args: &[SqlExpr]) -> Option<Bson> {
        if function == Function::IsDefined {
            let defined = args.first().and_then(|arg| self.evaluate(arg)).is_some();
            return Some(Bson::Boolean(defined));
        }

        let (first, second) = match args {
            [first, second] => (self.evaluate(first)?, self.evaluate(second)?),
            _ => return None,
        };

        let result = match (function, &first, &second) {
            (Function::StartsWith, Bson::String(value), Bson::String(prefix)) => value.starts_with(prefix.as_str()),
            (Function::EndsWith, Bson::String(value), Bson::String(suffix)) => value.ends_with(suffix.as_str()),
            (Function::Contains, Bson::String(value), Bson::String(needle)) => value.contains(needle.as_str()),
            (Function::ArrayContains, Bson::Array(values), needle) => {
                let needle = Comparable::from(needle);
                values.iter().any(|value| Comparable::from(value) == needle)
            }
            _ => return None,
        };

        Some(Bson::Boolean(result))
    }
}

fn compare(op: CompareOp, left: &Bson, right: &Bson) -> Option<bool> {
    let (left, right) = (Comparable::from(left), Comparable::from(right));

    if !left.same_type(&right) {
        return None;
    }

    match op {
        CompareOp::Eq => Some(left == right),
        CompareOp::Ne => Some(left != right),
        _ => {
            let ordering = left.partial_cmp(&right)?;
            Some(match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Lte => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
    }
}
