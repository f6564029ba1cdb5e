//! Predicate construction for document queries.
//!
//! Filters are built as an expression tree ([`Expr`]) over serialized field names and
//! are turned into the service's query language by a [`QueryVisitor`], such as the
//! [`SqlQueryTranslator`](crate::translate::SqlQueryTranslator).
//!
//! ```ignore
//! use cosmolayer_core::query::{Query, Filter, SortDirection};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("category", "books").and(Filter::gt("price", 10)))
//!     .sort("name", SortDirection::Asc)
//!     .offset(20)
//!     .limit(10)
//!     .build();
//! ```
//!
//! The [`Filter`] helper exposes:
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - String: `starts_with`, `ends_with`, `contains`, `not_contains`
//! - Existence: `exists`, `not_exists`
//! - Membership: `any_of`, `none_of`
//! - Logical: `and`, `or`

use bson::Bson;

use crate::error::DocumentStoreError;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort specification for query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to (exact match).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// String contains a substring, or array contains a value.
    Contains,
    /// Negation of [`FieldOp::Contains`].
    NotContains,
    /// String starts with value.
    StartsWith,
    /// String ends with value.
    EndsWith,
    /// Field value is one of the given values.
    AnyOf,
    /// Field value is none of the given values.
    NoneOf,
}

/// A filter expression over document fields.
///
/// Field names are the serialized names, and nested fields are addressed with dots
/// (`"address.city"`).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// All expressions must match.
    And(Vec<Expr>),
    /// Any expression must match.
    Or(Vec<Expr>),
    /// Inverts the inner expression.
    Not(Box<Expr>),
    /// Checks whether a field is present (`true`) or absent (`false`).
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression.
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// A structured query: filter, sort and an optional OFFSET/LIMIT window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter; `None` selects every document.
    pub filter: Option<Expr>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip.
    pub offset: Option<usize>,
    /// Sort specification for results.
    pub sort: Option<Sort>,
}

impl Query {
    /// Creates a query selecting every document.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a query with just a filter.
    pub fn filtered(filter: Expr) -> Self {
        Query { filter: Some(filter), ..Query::default() }
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Static constructors for filter expressions.
///
/// All methods accept field names as `Into<String>` and values as `Into<Bson>`.
pub struct Filter;

impl Filter {
    /// Matches documents where the field equals the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Matches documents where the field does not equal the value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Matches documents where the string field starts with the value.
    pub fn starts_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::StartsWith, value.into())
    }

    /// Matches documents where the string field ends with the value.
    pub fn ends_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::EndsWith, value.into())
    }

    /// Matches documents where the string field contains the substring, or the
    /// array field contains the value.
    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Contains, value.into())
    }

    pub fn not_contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NotContains, value.into())
    }

    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    /// Matches documents where the field value is one of `values` (an array).
    pub fn any_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, values.into())
    }

    /// Matches documents where the field value is none of `values` (an array).
    pub fn none_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NoneOf, values.into())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

/// Visitor over filter expressions, implemented by query translators and evaluators.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_chains_flatten() {
        let expr = Filter::eq("a", 1).and(Filter::eq("b", 2)).and(Filter::eq("c", 3));

        match expr {
            Expr::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected a flat AND, got {other:?}"),
        }
    }

    #[test]
    fn builder_sets_window_and_sort() {
        let query = Query::builder()
            .filter(Filter::exists("name"))
            .offset(20)
            .limit(10)
            .sort("name", SortDirection::Desc)
            .build();

        assert_eq!(query.offset, Some(20));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.sort.unwrap().direction, SortDirection::Desc);
    }
}
