//! Outcome of a product store operation.
//!
//! Every store call that gets past argument validation produces exactly one
//! [`ProductQueryResult`] variant. Remote failures are captured in the outcome instead
//! of being returned as errors, so callers branch on the outcome alone.

use serde::Serialize;

use cosmolayer::error::DocumentStoreError;

use crate::product::Product;

pub const PRODUCT_EXISTS: &str = "Product exists";
pub const PRODUCT_DOES_NOT_EXIST: &str = "Product does not exist";

/// Why a request was refused by a domain rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// A product with the same id is already stored.
    AlreadyExists,
    /// The requested page starts past the last product.
    PageOutOfRange,
}

/// Domain-level error messages returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub reason: RejectionReason,
    pub messages: Vec<String>,
}

impl ErrorResponse {
    pub fn already_exists() -> Self {
        Self { reason: RejectionReason::AlreadyExists, messages: vec![PRODUCT_EXISTS.to_string()] }
    }

    pub fn page_out_of_range() -> Self {
        Self { reason: RejectionReason::PageOutOfRange, messages: vec![PRODUCT_DOES_NOT_EXIST.to_string()] }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProductQueryResult {
    /// A single product.
    Item(Product),
    /// One page of products and the number of products stored.
    Items { items: Vec<Product>, total_count: u64 },
    /// No product matched. `cause` holds the remote not-found failure, if any.
    NotFound { cause: Option<DocumentStoreError> },
    /// A domain rule refused the request.
    Rejected(ErrorResponse),
    /// A remote failure that fits no other outcome.
    Failed(DocumentStoreError),
}

impl ProductQueryResult {
    pub fn not_found() -> Self {
        ProductQueryResult::NotFound { cause: None }
    }

    /// The captured failure, if any.
    pub fn exception(&self) -> Option<&DocumentStoreError> {
        match self {
            ProductQueryResult::NotFound { cause } => cause.as_ref(),
            ProductQueryResult::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// True when no failure was captured.
    ///
    /// A plain not-found and a domain rejection are successes in this sense; use
    /// [`is_not_found`](Self::is_not_found) and [`error_response`](Self::error_response)
    /// to tell them apart from a found product.
    pub fn is_success(&self) -> bool {
        self.exception().is_none()
    }

    pub fn has_exception(&self) -> bool {
        self.exception().is_some()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProductQueryResult::NotFound { .. })
    }

    pub fn error_response(&self) -> Option<&ErrorResponse> {
        match self {
            ProductQueryResult::Rejected(response) => Some(response),
            _ => None,
        }
    }

    pub fn product(&self) -> Option<&Product> {
        match self {
            ProductQueryResult::Item(product) => Some(product),
            _ => None,
        }
    }

    pub fn products(&self) -> Option<&[Product]> {
        match self {
            ProductQueryResult::Items { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn total_count(&self) -> Option<u64> {
        match self {
            ProductQueryResult::Items { total_count, .. } => Some(*total_count),
            _ => None,
        }
    }

    /// HTTP status an API layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ProductQueryResult::Item(_) | ProductQueryResult::Items { .. } => 200,
            ProductQueryResult::NotFound { .. } => 404,
            ProductQueryResult::Rejected(response) => match response.reason {
                RejectionReason::AlreadyExists => 409,
                RejectionReason::PageOutOfRange => 400,
            },
            ProductQueryResult::Failed(err) => err.class().status_code(),
        }
    }
}
