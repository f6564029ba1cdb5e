//! Translation of filter expressions into the service's SQL query language.
//!
//! Queries are addressed against the root alias `c`. Every literal value is bound as a
//! named parameter (`@p0`, `@p1`, ...), so the query text never contains user data.
//!
//! ```ignore
//! use cosmolayer_core::{query::{Query, Filter}, translate::SqlQueryTranslator};
//!
//! let definition = SqlQueryTranslator::translate(&Query::filtered(Filter::eq("id", "42")))?;
//! assert_eq!(definition.text, "SELECT * FROM c WHERE c.id = @p0");
//! ```

use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, Query, QueryVisitor, SortDirection},
};

/// Alias every generated query binds the container's documents to.
pub const ROOT_ALIAS: &str = "c";

/// Column name the count query projects its aggregate into.
pub const COUNT_ALIAS: &str = "Total";

/// Upper bound emitted for `LIMIT` when a query only sets an offset.
pub const MAX_LIMIT: usize = i32::MAX as usize;

const RESERVED_WORDS: [&str; 22] = [
    "AND", "ARRAY", "AS", "ASC", "BETWEEN", "BY", "DESC", "DISTINCT", "EXISTS", "FALSE",
    "FROM", "IN", "JOIN", "LIMIT", "NOT", "NULL", "OFFSET", "OR", "ORDER", "SELECT",
    "TRUE", "VALUE",
];

/// A named query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParameter {
    pub name: String,
    pub value: Bson,
}

/// A query in the service's language: SQL text plus its bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    pub text: String,
    pub parameters: Vec<QueryParameter>,
}

impl QueryDefinition {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), parameters: Vec::new() }
    }

    /// Binds a parameter. `name` includes the leading `@`.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.parameters.push(QueryParameter { name: name.into(), value: value.into() });
        self
    }

    /// Looks up a bound parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&Bson> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
            .map(|parameter| &parameter.value)
    }

    /// `SELECT * FROM c`
    pub fn select_all() -> Self {
        Self::new(format!("SELECT * FROM {ROOT_ALIAS}"))
    }

    /// `SELECT count(1) AS Total FROM c`
    pub fn count() -> Self {
        Self::new(format!("SELECT count(1) AS {COUNT_ALIAS} FROM {ROOT_ALIAS}"))
    }

    /// `SELECT * FROM c OFFSET {offset} LIMIT {limit}`
    pub fn page(offset: usize, limit: usize) -> Self {
        Self::new(format!("SELECT * FROM {ROOT_ALIAS} OFFSET {offset} LIMIT {limit}"))
    }
}

/// Translates [`Expr`] trees into SQL `WHERE` clauses.
///
/// Translation is pure. Shapes the query language cannot express fail with
/// [`DocumentStoreError::UnsupportedPredicate`] instead of being dropped.
#[derive(Debug, Default)]
pub struct SqlQueryTranslator {
    parameters: Vec<QueryParameter>,
}

impl SqlQueryTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translates a full structured query.
    pub fn translate(query: &Query) -> DocumentStoreResult<QueryDefinition> {
        let mut translator = Self::new();
        let mut text = format!("SELECT * FROM {ROOT_ALIAS}");

        if let Some(filter) = &query.filter {
            let clause = translator.visit_expr(filter)?;
            text.push_str(&format!(" WHERE {clause}"));
        }

        if let Some(sort) = &query.sort {
            let direction = match sort.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            text.push_str(&format!(" ORDER BY {} {direction}", field_path(&sort.field)?));
        }

        if query.offset.is_some() || query.limit.is_some() {
            text.push_str(&format!(
                " OFFSET {} LIMIT {}",
                query.offset.unwrap_or(0),
                query.limit.unwrap_or(MAX_LIMIT),
            ));
        }

        Ok(QueryDefinition { text, parameters: translator.parameters })
    }

    /// Translates an optional filter into a `SELECT *` query; `None` selects everything.
    pub fn translate_filter(filter: Option<&Expr>) -> DocumentStoreResult<QueryDefinition> {
        Self::translate(&Query { filter: filter.cloned(), ..Query::default() })
    }

    fn bind(&mut self, value: &Bson) -> DocumentStoreResult<String> {
        ensure_representable(value)?;

        let name = format!("@p{}", self.parameters.len());
        self.parameters.push(QueryParameter { name: name.clone(), value: value.clone() });

        Ok(name)
    }

    fn contains_clause(&mut self, path: &str, value: &Bson) -> DocumentStoreResult<String> {
        match value {
            Bson::String(_) => Ok(format!("CONTAINS({path}, {})", self.bind(value)?)),
            Bson::Array(values) if values.is_empty() => Err(unsupported(
                "contains requires at least one value",
            )),
            Bson::Array(values) => {
                let clauses = values
                    .iter()
                    .map(|value| Ok(format!("ARRAY_CONTAINS({path}, {})", self.bind(value)?)))
                    .collect::<DocumentStoreResult<Vec<_>>>()?;
                Ok(format!("({})", clauses.join(" AND ")))
            }
            _ => Ok(format!("ARRAY_CONTAINS({path}, {})", self.bind(value)?)),
        }
    }

    fn join(&mut self, exprs: &[Expr], operator: &str) -> DocumentStoreResult<String> {
        if exprs.is_empty() {
            return Err(unsupported(&format!("{operator} requires at least one operand")));
        }

        let clauses = exprs
            .iter()
            .map(|expr| self.visit_expr(expr))
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        Ok(format!("({})", clauses.join(&format!(" {operator} "))))
    }
}

impl QueryVisitor for SqlQueryTranslator {
    type Output = String;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        self.join(exprs, "AND")
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        self.join(exprs, "OR")
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(format!("NOT ({})", self.visit_expr(expr)?))
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        let path = field_path(field)?;

        Ok(if should_exist {
            format!("IS_DEFINED({path})")
        } else {
            format!("NOT IS_DEFINED({path})")
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let path = field_path(field)?;

        match op {
            FieldOp::Eq => Ok(format!("{path} = {}", self.bind(value)?)),
            FieldOp::Ne => Ok(format!("{path} != {}", self.bind(value)?)),
            FieldOp::Gt => Ok(format!("{path} > {}", self.bind(value)?)),
            FieldOp::Gte => Ok(format!("{path} >= {}", self.bind(value)?)),
            FieldOp::Lt => Ok(format!("{path} < {}", self.bind(value)?)),
            FieldOp::Lte => Ok(format!("{path} <= {}", self.bind(value)?)),
            FieldOp::StartsWith | FieldOp::EndsWith => {
                if !matches!(value, Bson::String(_)) {
                    return Err(unsupported(&format!("{op:?} requires a string value")));
                }
                let function = if *op == FieldOp::StartsWith { "STARTSWITH" } else { "ENDSWITH" };
                Ok(format!("{function}({path}, {})", self.bind(value)?))
            }
            FieldOp::Contains => self.contains_clause(&path, value),
            FieldOp::NotContains => Ok(format!("NOT {}", self.contains_clause(&path, value)?)),
            FieldOp::AnyOf | FieldOp::NoneOf => {
                if !matches!(value, Bson::Array(_)) {
                    return Err(unsupported(&format!("{op:?} requires an array value")));
                }
                let clause = format!("ARRAY_CONTAINS({}, {path})", self.bind(value)?);
                Ok(if *op == FieldOp::AnyOf { clause } else { format!("NOT {clause}") })
            }
        }
    }
}

/// Renders a dotted field name as a property path rooted at [`ROOT_ALIAS`].
pub fn field_path(field: &str) -> DocumentStoreResult<String> {
    if field.is_empty() {
        return Err(unsupported("field name must not be empty"));
    }

    let mut path = ROOT_ALIAS.to_string();

    for segment in field.split('.') {
        if segment.is_empty() {
            return Err(unsupported(&format!("field `{field}` has an empty path segment")));
        }

        if is_plain_identifier(segment) {
            path.push_str(&format!(".{segment}"));
        } else {
            let escaped = segment.replace('\\', "\\\\").replace('"', "\\\"");
            path.push_str(&format!("[\"{escaped}\"]"));
        }
    }

    Ok(path)
}

fn is_plain_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    let starts_well = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');

    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED_WORDS.contains(&segment.to_ascii_uppercase().as_str())
}

fn ensure_representable(value: &Bson) -> DocumentStoreResult<()> {
    match value {
        Bson::Null
        | Bson::Boolean(_)
        | Bson::Int32(_)
        | Bson::Int64(_)
        | Bson::Double(_)
        | Bson::String(_) => Ok(()),
        Bson::Array(values) => values.iter().try_for_each(ensure_representable),
        Bson::Document(document) => document.values().try_for_each(ensure_representable),
        other => Err(unsupported(&format!("value {other} has no JSON representation"))),
    }
}

fn unsupported(reason: &str) -> DocumentStoreError {
    DocumentStoreError::UnsupportedPredicate(reason.to_string())
}
