//! Product store: business operations over a product client.
//!
//! Argument errors are returned as `Err` before any remote call. Once a remote call
//! has been made, every outcome, failures included, is reported as a
//! [`ProductQueryResult`].

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use cosmolayer::{
    client::DocumentClient,
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    facade::TypedClient,
    page::PageRequest,
    query::{Filter, Query},
};

use crate::{
    config::ProvisioningConfig,
    product::Product,
    result::{ErrorResponse, ProductQueryResult},
};

/// Product operations over any client facade whose documents are [`Product`]s.
///
/// # Example
///
/// ```ignore
/// let store = ProductStore::new(ProductClient::new(InMemoryStore::builder().build().await?));
/// store.bootstrap(&ProvisioningConfig::default()).await?;
///
/// let added = store.add(Product::new("Lamp", "Desk lamp", "ops")).await?;
/// assert_eq!(added.status_code(), 200);
/// ```
#[derive(Debug, Clone)]
pub struct ProductStore<C: TypedClient<Document = Product>> {
    client: C,
    cancel: CancellationToken,
}

impl<C: TypedClient<Document = Product>> ProductStore<C> {
    pub fn new(client: C) -> Self {
        Self::with_cancellation(client, CancellationToken::new())
    }

    /// Creates a store whose operations all observe `cancel`.
    pub fn with_cancellation(client: C, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn documents(&self) -> &DocumentClient<C::Backend, Product> {
        self.client.client()
    }

    /// Creates the product database and container if they are missing.
    ///
    /// Unlike the other operations, provisioning failures are returned as errors.
    #[instrument(skip_all, fields(database = C::DATABASE_ID, container = C::CONTAINER_ID))]
    pub async fn bootstrap(&self, config: &ProvisioningConfig) -> DocumentStoreResult<()> {
        let documents = self.documents();

        documents
            .ensure_database_exists(config.database_throughput, None, &self.cancel)
            .await?;
        documents
            .ensure_container_exists(
                C::container_properties(),
                config.container_throughput,
                None,
                &self.cancel,
            )
            .await?;

        debug!(partition_key_path = C::PARTITION_KEY_PATH, "product container ready");

        Ok(())
    }

    /// Looks a product up by id.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Validation`] if `id` is empty.
    #[instrument(skip(self), fields(container = C::CONTAINER_ID))]
    pub async fn find_by_id(&self, id: &str) -> DocumentStoreResult<ProductQueryResult> {
        if id.is_empty() {
            return Err(DocumentStoreError::Validation("product id must not be empty".into()));
        }

        Ok(match self.lookup(id).await {
            Ok(Some(product)) => ProductQueryResult::Item(product),
            Ok(None) => ProductQueryResult::not_found(),
            Err(err) => captured(err),
        })
    }

    /// Adds a product unless one with the same id already exists.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Validation`] if the product id is empty.
    #[instrument(skip_all, fields(container = C::CONTAINER_ID, id = %product.id))]
    pub async fn add(&self, product: Product) -> DocumentStoreResult<ProductQueryResult> {
        if product.id.is_empty() {
            return Err(DocumentStoreError::Validation("product id must not be empty".into()));
        }

        match self.lookup(&product.id).await {
            Ok(Some(_)) => {
                debug!("product already stored");
                return Ok(ProductQueryResult::Rejected(ErrorResponse::already_exists()));
            }
            Ok(None) => {}
            Err(err) => return Ok(failed(err)),
        }

        Ok(match self.documents().insert(&product, None, None, &self.cancel).await {
            Ok(created) => ProductQueryResult::Item(created),
            Err(DocumentStoreError::DocumentAlreadyExists(..)) => {
                debug!("product created concurrently");
                ProductQueryResult::Rejected(ErrorResponse::already_exists())
            }
            Err(err) => failed(err),
        })
    }

    /// Returns page `page` (1-based) of `page_size` products with the total count.
    ///
    /// A page that starts past the last product is rejected with
    /// [`ErrorResponse::page_out_of_range`]. A page starting exactly at the end is
    /// returned empty.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Validation`] if `page` or `page_size` is not positive.
    #[instrument(skip(self), fields(container = C::CONTAINER_ID))]
    pub async fn get(&self, page: i64, page_size: i64) -> DocumentStoreResult<ProductQueryResult> {
        let request = PageRequest::new(page, page_size)?;
        let documents = self.documents();

        let total_count = match documents.get_total_count(None, &self.cancel).await {
            Ok(total) => total,
            Err(err) => return Ok(failed(err)),
        };

        if request.starts_beyond(total_count) {
            debug!(total_count, offset = request.offset(), "page out of range");
            return Ok(ProductQueryResult::Rejected(ErrorResponse::page_out_of_range()));
        }

        Ok(match documents.get_items_paged(page, page_size, None, &self.cancel).await {
            Ok(items) => ProductQueryResult::Items { items, total_count },
            Err(err) => failed(err),
        })
    }

    /// Product deletion is not offered.
    pub async fn delete(&self, _id: &str) -> DocumentStoreResult<ProductQueryResult> {
        Err(DocumentStoreError::Unimplemented("product deletion"))
    }

    async fn lookup(&self, id: &str) -> DocumentStoreResult<Option<Product>> {
        let query = Query::builder()
            .filter(Filter::eq(Product::ID_FIELD, id))
            .limit(1)
            .build();

        let mut found = self.documents().query(&query, None, &self.cancel).await?;

        Ok(if found.is_empty() { None } else { Some(found.swap_remove(0)) })
    }
}

/// Maps a failed `find_by_id` lookup: not-found failures keep their not-found meaning.
fn captured(err: DocumentStoreError) -> ProductQueryResult {
    if err.is_not_found() {
        warn!(error = %err, "product lookup hit a missing resource");
        ProductQueryResult::NotFound { cause: Some(err) }
    } else {
        failed(err)
    }
}

fn failed(err: DocumentStoreError) -> ProductQueryResult {
    warn!(error = %err, class = ?err.class(), "product operation failed");
    ProductQueryResult::Failed(err)
}
