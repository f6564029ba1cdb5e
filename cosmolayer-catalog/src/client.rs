//! The product client facade.

use std::ops::Deref;

use cosmolayer::{backend::StoreBackend, client::DocumentClient, facade::TypedClient};

use crate::product::Product;

/// A [`DocumentClient`] bound to the `Product` database and container.
#[derive(Debug, Clone)]
pub struct ProductClient<B: StoreBackend> {
    client: DocumentClient<B, Product>,
}

impl<B: StoreBackend> ProductClient<B> {
    pub fn new(backend: B) -> Self {
        Self { client: Self::bind(backend) }
    }
}

impl<B: StoreBackend> TypedClient for ProductClient<B> {
    type Backend = B;
    type Document = Product;

    const DATABASE_ID: &'static str = "Product";
    const CONTAINER_ID: &'static str = "Product";

    fn client(&self) -> &DocumentClient<B, Product> {
        &self.client
    }
}

impl<B: StoreBackend> Deref for ProductClient<B> {
    type Target = DocumentClient<B, Product>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}
