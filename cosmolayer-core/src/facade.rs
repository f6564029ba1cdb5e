//! Typed client facades.
//!
//! A facade fixes the database id, container id and document type of a
//! [`DocumentClient`] at compile time, so domain code asks for "the product client"
//! instead of passing names around.
//!
//! ```ignore
//! pub struct OrderClient<B: StoreBackend>(DocumentClient<B, Order>);
//!
//! impl<B: StoreBackend> TypedClient for OrderClient<B> {
//!     type Backend = B;
//!     type Document = Order;
//!
//!     const DATABASE_ID: &'static str = "Shop";
//!     const CONTAINER_ID: &'static str = "Orders";
//!
//!     fn client(&self) -> &DocumentClient<B, Order> {
//!         &self.0
//!     }
//! }
//! ```

use crate::{
    backend::StoreBackend,
    client::DocumentClient,
    document::Document,
    resource::{ContainerProperties, DEFAULT_PARTITION_KEY_PATH},
};

/// A [`DocumentClient`] bound to fixed identifiers and a fixed document type.
pub trait TypedClient: Send + Sync {
    type Backend: StoreBackend;
    type Document: Document;

    const DATABASE_ID: &'static str;
    const CONTAINER_ID: &'static str;

    /// Partition key path the container is provisioned with.
    const PARTITION_KEY_PATH: &'static str = DEFAULT_PARTITION_KEY_PATH;

    /// Returns the underlying client.
    fn client(&self) -> &DocumentClient<Self::Backend, Self::Document>;

    /// Builds a client bound to this facade's identifiers.
    fn bind(backend: Self::Backend) -> DocumentClient<Self::Backend, Self::Document> {
        DocumentClient::new(backend, Self::DATABASE_ID, Self::CONTAINER_ID)
    }

    /// Properties of the container this facade provisions.
    fn container_properties() -> ContainerProperties {
        ContainerProperties::new(Self::CONTAINER_ID, Self::PARTITION_KEY_PATH)
    }
}
