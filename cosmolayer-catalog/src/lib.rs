//! Product catalog built on cosmolayer.
//!
//! [`ProductStore`] offers find, add and paged listing of [`Product`]s through any
//! [`TypedClient`](cosmolayer::facade::TypedClient) whose documents are products,
//! usually a [`ProductClient`]. Outcomes are reported as [`ProductQueryResult`]s that
//! an API layer can turn into responses with
//! [`status_code`](ProductQueryResult::status_code).
//!
//! ```ignore
//! use cosmolayer::memory::InMemoryStore;
//! use cosmolayer::backend::StoreBackendBuilder;
//! use cosmolayer_catalog::{Product, ProductClient, ProductStore, ProvisioningConfig};
//!
//! let store = ProductStore::new(ProductClient::new(InMemoryStore::builder().build().await?));
//! store.bootstrap(&ProvisioningConfig::default()).await?;
//!
//! store.add(Product::new("Lamp", "Desk lamp", "ops")).await?;
//! let first = store.get(1, 20).await?;
//! println!("{} of {:?}", first.products().map_or(0, |p| p.len()), first.total_count());
//! ```

pub mod client;
pub mod config;
pub mod product;
pub mod result;
pub mod store;

pub use client::ProductClient;
pub use config::ProvisioningConfig;
pub use product::Product;
pub use result::{ErrorResponse, ProductQueryResult, RejectionReason};
pub use store::ProductStore;
