//! Main cosmolayer crate: a generic, strongly-typed client over partitioned JSON
//! document databases.
//!
//! This crate is the primary entry point. It re-exports the core types from the
//! sub-crates, the `Document` derive, and the in-memory emulator backend.
//!
//! # Features
//!
//! - **Typed documents** - Define documents with Serde and `#[derive(Document)]`
//! - **One client per container** - [`DocumentClient`](client::DocumentClient) is generic over backend and document type
//! - **Parameterized queries** - Filter expressions translate to SQL with bound parameters
//! - **Complete paging** - Paged reads follow continuation tokens until the feed is exhausted
//! - **Cancellation** - Every operation takes a `CancellationToken`
//!
//! # Quick Start
//!
//! ```ignore
//! use cosmolayer::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! pub struct User {
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let cancel = CancellationToken::new();
//!     let users = DocumentClient::<_, User>::new(
//!         InMemoryStore::builder().build().await?,
//!         "Accounts",
//!         "Users",
//!     );
//!
//!     users.ensure_database_exists(None, None, &cancel).await?;
//!     users.ensure_container_exists(ContainerProperties::default(), None, None, &cancel).await?;
//!
//!     users.insert(&User { id: "u-1".into(), name: "Alice".into() }, None, None, &cancel).await?;
//!
//!     let alices = users
//!         .get_items(None, Some(&Filter::eq("name", "Alice")), None, &cancel)
//!         .await?;
//!     println!("Queried users: {:?}", alices.items);
//!
//!     let first_page = users.get_items_paged(1, 20, None, &cancel).await?;
//!     println!("First page: {first_page:?}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Typed Facades
//!
//! Implement [`TypedClient`](facade::TypedClient) to pin a client to fixed database
//! and container ids, so application code never repeats them.
//!
//! # Backends
//!
//! - [`memory`] - In-process emulator for development and testing

#[allow(unused_extern_crates)]
extern crate self as cosmolayer;

pub mod prelude;

pub use cosmolayer_core::{backend, client, document, error, facade, options, page, query, resource, translate};
pub use cosmolayer_macros::Document;

// Re-export BSON types for convenience
pub use bson;

/// In-memory emulator backend.
pub mod memory {
    pub use cosmolayer_memory::{InMemoryStore, InMemoryStoreBuilder, store::DEFAULT_MAX_PAGE_SIZE};
}
