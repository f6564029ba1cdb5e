//! Connection abstraction over the remote document service.
//!
//! [`StoreBackend`] is the single seam between the generic client and the service that
//! actually stores documents. Each method is one remote round-trip. Implementations
//! must be safe to share between many in-flight operations: the client never locks a
//! backend per call, it only borrows it.
//!
//! Backends report failures through [`DocumentStoreError`](crate::error::DocumentStoreError)
//! variants whose [`class`](crate::error::DocumentStoreError::class) tells callers
//! whether the request was bad, the resource was missing, a precondition failed, the
//! client was throttled, or the service could not be reached.
//!
//! # Traits
//!
//! - [`StoreBackend`]: the remote service operations
//! - [`StoreBackendBuilder`]: factory for backend instances

use async_trait::async_trait;
use bson::Document;
use std::{fmt::Debug, sync::Arc};

use crate::{
    document::PartitionKey,
    error::DocumentStoreResult,
    options::{QueryOptions, RequestOptions},
    page::{FeedPage, ItemResponse},
    resource::{ContainerProperties, DatabaseProperties, FunctionProperties, ThroughputProperties},
    translate::QueryDefinition,
};

/// Remote operations of a partitioned document service.
///
/// Items travel as BSON documents; typing happens in
/// [`DocumentClient`](crate::client::DocumentClient).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Creates the database unless it already exists, and returns its properties.
    async fn create_database_if_not_exists(
        &self,
        database: &str,
        throughput: Option<ThroughputProperties>,
        options: &RequestOptions,
    ) -> DocumentStoreResult<DatabaseProperties>;

    /// Creates the container unless it already exists, and returns its properties.
    ///
    /// When the container exists its stored properties are returned unchanged.
    async fn create_container_if_not_exists(
        &self,
        database: &str,
        properties: ContainerProperties,
        throughput: Option<ThroughputProperties>,
        options: &RequestOptions,
    ) -> DocumentStoreResult<ContainerProperties>;

    /// Reads the properties of an existing container.
    async fn read_container(
        &self,
        database: &str,
        container: &str,
        options: &RequestOptions,
    ) -> DocumentStoreResult<ContainerProperties>;

    /// Reads one page of the database's container listing.
    async fn query_containers(
        &self,
        database: &str,
        continuation: Option<&str>,
        options: &QueryOptions,
    ) -> DocumentStoreResult<FeedPage<ContainerProperties>>;

    /// Creates a new item. Fails with a conflict if the id already exists in the partition.
    ///
    /// When `partition_key` is `None` the service extracts it from the document.
    async fn create_item(
        &self,
        database: &str,
        container: &str,
        partition_key: Option<PartitionKey>,
        document: Document,
        options: &RequestOptions,
    ) -> DocumentStoreResult<ItemResponse<Document>>;

    /// Point read of an item by id and partition key.
    async fn read_item(
        &self,
        database: &str,
        container: &str,
        id: &str,
        partition_key: &PartitionKey,
        options: &RequestOptions,
    ) -> DocumentStoreResult<ItemResponse<Document>>;

    /// Replaces an existing item entirely.
    async fn replace_item(
        &self,
        database: &str,
        container: &str,
        id: &str,
        partition_key: Option<PartitionKey>,
        document: Document,
        options: &RequestOptions,
    ) -> DocumentStoreResult<ItemResponse<Document>>;

    /// Deletes an item and returns the value it held.
    async fn delete_item(
        &self,
        database: &str,
        container: &str,
        id: &str,
        partition_key: &PartitionKey,
        options: &RequestOptions,
    ) -> DocumentStoreResult<ItemResponse<Document>>;

    /// Executes one page of a query.
    ///
    /// `continuation` is the token of the previous page, or `None` for the first page.
    async fn query_items(
        &self,
        database: &str,
        container: &str,
        query: &QueryDefinition,
        continuation: Option<&str>,
        options: &QueryOptions,
    ) -> DocumentStoreResult<FeedPage<Document>>;

    /// Registers a user-defined function, replacing any function with the same id.
    async fn create_function(
        &self,
        database: &str,
        container: &str,
        function: FunctionProperties,
        options: &RequestOptions,
    ) -> DocumentStoreResult<FunctionProperties>;

    /// Removes a user-defined function.
    async fn delete_function(
        &self,
        database: &str,
        container: &str,
        id: &str,
        options: &RequestOptions,
    ) -> DocumentStoreResult<()>;

    /// Releases the connection.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

macro_rules! forward_store_backend {
    ($($target:ty),+ $(,)?) => {$(
        #[async_trait]
        impl<B> StoreBackend for $target
        where
            B: StoreBackend + ?Sized,
        {
            async fn create_database_if_not_exists(
                &self,
                database: &str,
                throughput: Option<ThroughputProperties>,
                options: &RequestOptions,
            ) -> DocumentStoreResult<DatabaseProperties> {
                (**self)
                    .create_database_if_not_exists(database, throughput, options)
                    .await
            }

            async fn create_container_if_not_exists(
                &self,
                database: &str,
                properties: ContainerProperties,
                throughput: Option<ThroughputProperties>,
                options: &RequestOptions,
            ) -> DocumentStoreResult<ContainerProperties> {
                (**self)
                    .create_container_if_not_exists(database, properties, throughput, options)
                    .await
            }

            async fn read_container(
                &self,
                database: &str,
                container: &str,
                options: &RequestOptions,
            ) -> DocumentStoreResult<ContainerProperties> {
                (**self)
                    .read_container(database, container, options)
                    .await
            }

            async fn query_containers(
                &self,
                database: &str,
                continuation: Option<&str>,
                options: &QueryOptions,
            ) -> DocumentStoreResult<FeedPage<ContainerProperties>> {
                (**self)
                    .query_containers(database, continuation, options)
                    .await
            }

            async fn create_item(
                &self,
                database: &str,
                container: &str,
                partition_key: Option<PartitionKey>,
                document: Document,
                options: &RequestOptions,
            ) -> DocumentStoreResult<ItemResponse<Document>> {
                (**self)
                    .create_item(database, container, partition_key, document, options)
                    .await
            }

            async fn read_item(
                &self,
                database: &str,
                container: &str,
                id: &str,
                partition_key: &PartitionKey,
                options: &RequestOptions,
            ) -> DocumentStoreResult<ItemResponse<Document>> {
                (**self)
                    .read_item(database, container, id, partition_key, options)
                    .await
            }

            async fn replace_item(
                &self,
                database: &str,
                container: &str,
                id: &str,
                partition_key: Option<PartitionKey>,
                document: Document,
                options: &RequestOptions,
            ) -> DocumentStoreResult<ItemResponse<Document>> {
                (**self)
                    .replace_item(database, container, id, partition_key, document, options)
                    .await
            }

            async fn delete_item(
                &self,
                database: &str,
                container: &str,
                id: &str,
                partition_key: &PartitionKey,
                options: &RequestOptions,
            ) -> DocumentStoreResult<ItemResponse<Document>> {
                (**self)
                    .delete_item(database, container, id, partition_key, options)
                    .await
            }

            async fn query_items(
                &self,
                database: &str,
                container: &str,
                query: &QueryDefinition,
                continuation: Option<&str>,
                options: &QueryOptions,
            ) -> DocumentStoreResult<FeedPage<Document>> {
                (**self)
                    .query_items(database, container, query, continuation, options)
                    .await
            }

            async fn create_function(
                &self,
                database: &str,
                container: &str,
                function: FunctionProperties,
                options: &RequestOptions,
            ) -> DocumentStoreResult<FunctionProperties> {
                (**self)
                    .create_function(database, container, function, options)
                    .await
            }

            async fn delete_function(
                &self,
                database: &str,
                container: &str,
                id: &str,
                options: &RequestOptions,
            ) -> DocumentStoreResult<()> {
                (**self)
                    .delete_function(database, container, id, options)
                    .await
            }
        }
    )+};
}

forward_store_backend!(&B, Arc<B>, Box<B>);

/// Factory for backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
