//! Convenient re-exports of commonly used types from cosmolayer.
//!
//! ```ignore
//! use cosmolayer::prelude::*;
//! ```
//!
//! This provides access to:
//! - Document traits, partition keys and the `Document` derive
//! - Store backends, builders and the document client
//! - Query construction, filtering and translation
//! - Request options, resources, paging and error types

pub use cosmolayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    client::DocumentClient,
    document::{Document, DocumentExt, PartitionKey},
    error::{DocumentStoreError, DocumentStoreResult, ErrorClass},
    facade::TypedClient,
    options::{ConsistencyLevel, QueryOptions, RequestOptions},
    page::{FeedPage, ItemResponse, PageRequest},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    resource::{ContainerProperties, DatabaseProperties, FunctionProperties, ThroughputProperties},
    translate::{QueryDefinition, SqlQueryTranslator},
};
pub use cosmolayer_macros::Document;
pub use tokio_util::sync::CancellationToken;
