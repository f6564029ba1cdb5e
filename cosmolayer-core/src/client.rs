//! The generic document client.
//!
//! A [`DocumentClient`] binds a shared backend handle to one database, one container and
//! one document type. It provisions its database and container, performs single-item
//! CRUD, runs predicate and paged queries, counts documents, and manages user-defined
//! functions.
//!
//! Every operation takes a [`CancellationToken`]. The token is checked before each
//! remote round-trip; once a write has been sent it is not rolled back. Deadlines are
//! the caller's concern: cancel the token when the deadline passes.
//!
//! # Example
//!
//! ```ignore
//! use cosmolayer_core::{client::DocumentClient, query::Filter};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let orders = DocumentClient::<_, Order>::new(backend, "Shop", "Orders");
//!
//! orders.ensure_database_exists(None, None, &cancel).await?;
//! orders.ensure_container_exists(ContainerProperties::default(), None, None, &cancel).await?;
//! orders.insert(&order, None, None, &cancel).await?;
//!
//! let page = orders.get_items(None, Some(&Filter::eq("customer", "ada")), None, &cancel).await?;
//! let third_page = orders.get_items_paged(3, 20, None, &cancel).await?;
//! ```

use std::marker::PhantomData;

use bson::Bson;
use futures::{Stream, TryStreamExt, stream::try_unfold};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::{
    backend::StoreBackend,
    document::{Document, DocumentExt, PartitionKey},
    error::{DocumentStoreError, DocumentStoreResult},
    options::{QueryOptions, RequestOptions},
    page::{FeedPage, ItemResponse, PageRequest},
    query::{Expr, Query},
    resource::{ContainerProperties, DatabaseProperties, FunctionProperties, ThroughputProperties},
    translate::{COUNT_ALIAS, QueryDefinition, SqlQueryTranslator},
};

/// Position of a feed drain between two page fetches.
enum FeedCursor {
    Start,
    Next(String),
    Done,
}

/// A client for one container, typed over its document type `D`.
///
/// The client holds no mutable state; any number of operations may run concurrently
/// against the same client. `B` is typically a cheap-to-clone handle such as
/// `Arc<impl StoreBackend>` shared by every client of the process.
#[derive(Debug, Clone)]
pub struct DocumentClient<B: StoreBackend, D: Document> {
    backend: B,
    database_id: String,
    container_id: String,
    request_options: RequestOptions,
    query_options: QueryOptions,
    _marker: PhantomData<D>,
}

impl<B: StoreBackend, D: Document> DocumentClient<B, D> {
    pub fn new(backend: B, database_id: impl Into<String>, container_id: impl Into<String>) -> Self {
        Self {
            backend,
            database_id: database_id.into(),
            container_id: container_id.into(),
            request_options: RequestOptions::default(),
            query_options: QueryOptions::default(),
            _marker: PhantomData,
        }
    }

    /// Sets the request options used when an operation is given `None`.
    pub fn with_request_options(mut self, options: RequestOptions) -> Self {
        self.request_options = options;
        self
    }

    /// Sets the query options used when a query is given `None`.
    pub fn with_query_options(mut self, options: QueryOptions) -> Self {
        self.query_options = options;
        self
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Creates the database if it does not exist yet. Safe to call repeatedly.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id))]
    pub async fn ensure_database_exists(
        &self,
        throughput: Option<ThroughputProperties>,
        options: Option<&RequestOptions>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<DatabaseProperties> {
        ensure_active(cancel)?;

        self.backend
            .create_database_if_not_exists(&self.database_id, throughput, self.request_options(options))
            .await
    }

    /// Creates the container if it does not exist yet. Safe to call repeatedly.
    ///
    /// The id in `properties` is replaced with this client's container id.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id, container = %self.container_id))]
    pub async fn ensure_container_exists(
        &self,
        mut properties: ContainerProperties,
        throughput: Option<ThroughputProperties>,
        options: Option<&RequestOptions>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<ContainerProperties> {
        ensure_active(cancel)?;
        properties.id = self.container_id.clone();

        self.backend
            .create_container_if_not_exists(&self.database_id, properties, throughput, self.request_options(options))
            .await
    }

    /// Reads this client's container properties.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id, container = %self.container_id))]
    pub async fn read_container(
        &self,
        options: Option<&RequestOptions>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<ContainerProperties> {
        ensure_active(cancel)?;

        self.backend
            .read_container(&self.database_id, &self.container_id, self.request_options(options))
            .await
    }

    /// Lists every container of this client's database.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id))]
    pub async fn list_containers(&self, cancel: &CancellationToken) -> DocumentStoreResult<Vec<ContainerProperties>> {
        let mut containers = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            ensure_active(cancel)?;

            let page = self.backend
                .query_containers(&self.database_id, continuation.as_deref(), &self.query_options)
                .await?;
            let more = page.has_more_results();

            containers.extend(page.items);
            if !more {
                break;
            }
            continuation = page.continuation;
        }

        Ok(containers)
    }

    /// Creates a document.
    ///
    /// When `partition_key` is `None` the document's own partition key is sent.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id, container = %self.container_id, id = %document.id()))]
    pub async fn insert(
        &self,
        document: &D,
        partition_key: Option<PartitionKey>,
        options: Option<&RequestOptions>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<D> {
        let body = document.to_bson_document()?;
        let partition_key = partition_key.unwrap_or_else(|| document.partition_key());

        ensure_active(cancel)?;

        let response = self.backend
            .create_item(
                &self.database_id,
                &self.container_id,
                Some(partition_key),
                body,
                self.request_options(options),
            )
            .await?;

        decode(response.resource)
    }

    /// Point read of a document, returning it with its etag.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id, container = %self.container_id, id = %id))]
    pub async fn read_item(
        &self,
        id: &str,
        partition_key: &PartitionKey,
        options: Option<&RequestOptions>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<ItemResponse<D>> {
        ensure_active(cancel)?;

        self.backend
            .read_item(&self.database_id, &self.container_id, id, partition_key, self.request_options(options))
            .await?
            .try_map(decode)
    }

    /// Fetches one page of documents matching `predicate`, or of all documents when
    /// `predicate` is `None`.
    ///
    /// Pass the returned page's continuation back in to read the next page.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::UnsupportedPredicate`] without contacting the
    /// service if the predicate cannot be translated.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id, container = %self.container_id))]
    pub async fn get_items(
        &self,
        options: Option<&QueryOptions>,
        predicate: Option<&Expr>,
        continuation: Option<&str>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<FeedPage<D>> {
        let query = SqlQueryTranslator::translate_filter(predicate)?;

        ensure_active(cancel)?;

        self.backend
            .query_items(
                &self.database_id,
                &self.container_id,
                &query,
                continuation,
                self.query_options(options),
            )
            .await?
            .try_map(decode)
    }

    /// Replaces a document entirely.
    ///
    /// Set [`RequestOptions::if_match`] to make the replace conditional on the etag of a
    /// previous read.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id, container = %self.container_id, id = %id))]
    pub async fn replace_item(
        &self,
        id: &str,
        document: &D,
        partition_key: Option<PartitionKey>,
        options: Option<&RequestOptions>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<D> {
        let body = document.to_bson_document()?;
        let partition_key = partition_key.unwrap_or_else(|| document.partition_key());

        ensure_active(cancel)?;

        let response = self.backend
            .replace_item(
                &self.database_id,
                &self.container_id,
                id,
                Some(partition_key),
                body,
                self.request_options(options),
            )
            .await?;

        decode(response.resource)
    }

    /// Deletes a document and returns the value it held.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id, container = %self.container_id, id = %id))]
    pub async fn remove_item(
        &self,
        id: &str,
        partition_key: &PartitionKey,
        options: Option<&RequestOptions>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<D> {
        ensure_active(cancel)?;

        let response = self.backend
            .delete_item(&self.database_id, &self.container_id, id, partition_key, self.request_options(options))
            .await?;

        decode(response.resource)
    }

    /// Counts the documents in the container.
    ///
    /// Returns 0 when the count query produces no row.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id, container = %self.container_id))]
    pub async fn get_total_count(
        &self,
        options: Option<&QueryOptions>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<u64> {
        ensure_active(cancel)?;

        let page = self.backend
            .query_items(
                &self.database_id,
                &self.container_id,
                &QueryDefinition::count(),
                None,
                self.query_options(options),
            )
            .await?;

        let total = match page.items.first().and_then(|row| row.get(COUNT_ALIAS)) {
            None => 0,
            Some(Bson::Int32(count)) => (*count).max(0) as u64,
            Some(Bson::Int64(count)) => (*count).max(0) as u64,
            Some(Bson::Double(count)) if *count >= 0.0 => *count as u64,
            Some(other) => {
                return Err(DocumentStoreError::Serialization(format!(
                    "count query returned a non-numeric total: {other}"
                )));
            }
        };

        debug!(total, "counted documents");

        Ok(total)
    }

    /// Returns page `page` (1-based) of `page_size` documents.
    ///
    /// The OFFSET/LIMIT query is drained completely: continuation tokens are followed
    /// until the service reports no more results, so the caller never sees the service's
    /// own page size. The whole page is buffered in memory; `page_size` bounds that
    /// buffer and is not capped here.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::Validation`] if `page` or `page_size` is not positive,
    ///   before any remote call.
    /// - [`DocumentStoreError::Cancelled`] if the token is cancelled between two page
    ///   fetches. Items already fetched are discarded.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id, container = %self.container_id, page = page, page_size = page_size))]
    pub async fn get_items_paged(
        &self,
        page: i64,
        page_size: i64,
        options: Option<&QueryOptions>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<Vec<D>> {
        let request = PageRequest::new(page, page_size)?;

        self.drain(
            QueryDefinition::page(request.offset(), request.page_size()),
            options,
            cancel,
        )
        .await
    }

    /// Runs a structured query and drains every page of its results.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id, container = %self.container_id))]
    pub async fn query(
        &self,
        query: &Query,
        options: Option<&QueryOptions>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<Vec<D>> {
        let definition = SqlQueryTranslator::translate(query)?;

        self.drain(definition, options, cancel).await
    }

    /// Streams the pages of a query, following continuation tokens.
    ///
    /// The token is checked before every page fetch; a cancelled token ends the stream
    /// with [`DocumentStoreError::Cancelled`].
    pub fn query_pages<'a>(
        &'a self,
        query: QueryDefinition,
        options: Option<&'a QueryOptions>,
        cancel: &'a CancellationToken,
    ) -> impl Stream<Item = DocumentStoreResult<FeedPage<D>>> + 'a {
        let options = self.query_options(options);

        try_unfold((query, FeedCursor::Start), move |(query, cursor)| {
            self.next_page(query, cursor, options, cancel)
        })
    }

    /// Registers a user-defined function on the container, replacing any previous body.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id, container = %self.container_id, function = %id))]
    pub async fn create_function(
        &self,
        id: &str,
        body: &str,
        options: Option<&RequestOptions>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<FunctionProperties> {
        ensure_active(cancel)?;

        self.backend
            .create_function(
                &self.database_id,
                &self.container_id,
                FunctionProperties { id: id.to_string(), body: body.to_string() },
                self.request_options(options),
            )
            .await
    }

    /// Removes a user-defined function from the container.
    #[instrument(level = "debug", skip_all, fields(database = %self.database_id, container = %self.container_id, function = %id))]
    pub async fn delete_function(
        &self,
        id: &str,
        options: Option<&RequestOptions>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<()> {
        ensure_active(cancel)?;

        self.backend
            .delete_function(&self.database_id, &self.container_id, id, self.request_options(options))
            .await
    }

    async fn drain(
        &self,
        query: QueryDefinition,
        options: Option<&QueryOptions>,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<Vec<D>> {
        let items = self
            .query_pages(query, options, cancel)
            .try_fold(Vec::new(), |mut items, page| async move {
                items.extend(page.items);
                Ok(items)
            })
            .await?;

        debug!(items = items.len(), "drained query feed");

        Ok(items)
    }

    async fn next_page(
        &self,
        query: QueryDefinition,
        cursor: FeedCursor,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> DocumentStoreResult<Option<(FeedPage<D>, (QueryDefinition, FeedCursor))>> {
        let continuation = match cursor {
            FeedCursor::Done => return Ok(None),
            FeedCursor::Start => None,
            FeedCursor::Next(token) => Some(token),
        };

        ensure_active(cancel)?;

        let page = self.backend
            .query_items(&self.database_id, &self.container_id, &query, continuation.as_deref(), options)
            .await?;

        debug!(items = page.items.len(), more = page.has_more_results(), "fetched feed page");

        let next = match &page.continuation {
            Some(token) if !token.is_empty() => FeedCursor::Next(token.clone()),
            _ => FeedCursor::Done,
        };

        Ok(Some((page.try_map(decode)?, (query, next))))
    }

    fn request_options<'a>(&'a self, options: Option<&'a RequestOptions>) -> &'a RequestOptions {
        options.unwrap_or(&self.request_options)
    }

    fn query_options<'a>(&'a self, options: Option<&'a QueryOptions>) -> &'a QueryOptions {
        options.unwrap_or(&self.query_options)
    }
}

fn ensure_active(cancel: &CancellationToken) -> DocumentStoreResult<()> {
    if cancel.is_cancelled() {
        return Err(DocumentStoreError::Cancelled);
    }

    Ok(())
}

fn decode<D: Document>(document: bson::Document) -> DocumentStoreResult<D> {
    D::from_bson(Bson::Document(document))
}
