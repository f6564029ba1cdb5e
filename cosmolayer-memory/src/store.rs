//! In-process emulator of a partitioned document service.
//!
//! Databases hold containers, containers hold items keyed by id within a partition.
//! Items keep their insertion order, which is the order queries return them in unless
//! an `ORDER BY` clause is given.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use bson::{Bson, Document};
use mea::rwlock::RwLock;
use tracing::debug;

use cosmolayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::PartitionKey,
    error::{DocumentStoreError, DocumentStoreResult},
    options::{QueryOptions, RequestOptions},
    page::{FeedPage, ItemResponse},
    query::SortDirection,
    resource::{ContainerProperties, DatabaseProperties, FunctionProperties, ThroughputProperties},
    translate::QueryDefinition,
};

use crate::{
    evaluator::{RowEvaluator, sort_order},
    sql::{Projection, SqlQuery},
};

/// Largest number of items a single feed page holds unless configured otherwise.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// System property carrying an item's version tag.
pub const ETAG_FIELD: &str = "_etag";

const ID_FIELD: &str = "id";

#[derive(Debug, Clone)]
struct StoredItem {
    id: String,
    partition_key: PartitionKey,
    document: Document,
    etag: String,
}

#[derive(Debug)]
struct ContainerState {
    properties: ContainerProperties,
    items: Vec<StoredItem>,
    functions: BTreeMap<String, FunctionProperties>,
}

impl ContainerState {
    fn position(&self, id: &str, partition_key: &PartitionKey) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.id == id && &item.partition_key == partition_key)
    }
}

#[derive(Debug)]
struct DatabaseState {
    properties: DatabaseProperties,
    containers: BTreeMap<String, ContainerState>,
}

type DatabaseMap = HashMap<String, DatabaseState>;

/// Thread-safe in-memory emulator of the remote document service.
///
/// `InMemoryStore` is cloneable and keeps its state behind an `Arc`; clones share the
/// same databases. Reads take a shared lock and writes an exclusive one, so every
/// operation observes a consistent snapshot.
///
/// Query results are split into feed pages of at most
/// [`max_page_size`](InMemoryStoreBuilder::with_max_page_size) items, continued with
/// opaque tokens, the way the real service pages them.
///
/// # Example
///
/// ```ignore
/// use cosmolayer_memory::InMemoryStore;
///
/// let store = InMemoryStore::builder().with_max_page_size(2).build().await?;
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    databases: Arc<RwLock<DatabaseMap>>,
    etag_sequence: Arc<AtomicU64>,
    max_page_size: usize,
}

impl InMemoryStore {
    /// Creates an empty emulator with the default page size.
    pub fn new() -> Self {
        Self {
            databases: Arc::new(RwLock::new(DatabaseMap::new())),
            etag_sequence: Arc::new(AtomicU64::new(0)),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    fn next_etag(&self) -> String {
        format!("\"{:016x}\"", self.etag_sequence.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn page_size(&self, options: &QueryOptions) -> usize {
        options
            .max_item_count
            .unwrap_or(self.max_page_size)
            .clamp(1, self.max_page_size.max(1))
    }

    /// Stamps a fresh etag on `document` and wraps it for storage.
    fn stamp(&self, id: String, partition_key: PartitionKey, mut document: Document) -> StoredItem {
        let etag = self.next_etag();
        document.insert(ETAG_FIELD, etag.clone());

        StoredItem { id, partition_key, document, etag }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn create_database_if_not_exists(
        &self,
        database: &str,
        throughput: Option<ThroughputProperties>,
        _options: &RequestOptions,
    ) -> DocumentStoreResult<DatabaseProperties> {
        let mut databases = self.databases.write().await;
        let state = databases
            .entry(database.to_string())
            .or_insert_with(|| DatabaseState {
                properties: DatabaseProperties { id: database.to_string(), throughput },
                containers: BTreeMap::new(),
            });

        Ok(state.properties.clone())
    }

    async fn create_container_if_not_exists(
        &self,
        database: &str,
        mut properties: ContainerProperties,
        throughput: Option<ThroughputProperties>,
        _options: &RequestOptions,
    ) -> DocumentStoreResult<ContainerProperties> {
        if properties.id.is_empty() {
            return Err(DocumentStoreError::BadRequest("container id must not be empty".to_string()));
        }

        let mut databases = self.databases.write().await;
        let database_state = databases
            .get_mut(database)
            .ok_or_else(|| DocumentStoreError::DatabaseNotFound(database.to_string()))?;

        properties.throughput = throughput.or(properties.throughput);

        let state = database_state
            .containers
            .entry(properties.id.clone())
            .or_insert_with(|| ContainerState {
                properties,
                items: Vec::new(),
                functions: BTreeMap::new(),
            });

        Ok(state.properties.clone())
    }

    async fn read_container(
        &self,
        database: &str,
        container: &str,
        _options: &RequestOptions,
    ) -> DocumentStoreResult<ContainerProperties> {
        let databases = self.databases.read().await;

        Ok(container_ref(&databases, database, container)?.properties.clone())
    }

    async fn query_containers(
        &self,
        database: &str,
        continuation: Option<&str>,
        options: &QueryOptions,
    ) -> DocumentStoreResult<FeedPage<ContainerProperties>> {
        let databases = self.databases.read().await;
        let database_state = databases
            .get(database)
            .ok_or_else(|| DocumentStoreError::DatabaseNotFound(database.to_string()))?;

        let containers = database_state
            .containers
            .values()
            .map(|state| state.properties.clone())
            .collect();

        paginate(containers, continuation, self.page_size(options))
    }

    async fn create_item(
        &self,
        database: &str,
        container: &str,
        partition_key: Option<PartitionKey>,
        document: Document,
        _options: &RequestOptions,
    ) -> DocumentStoreResult<ItemResponse<Document>> {
        let mut databases = self.databases.write().await;
        let state = container_mut(&mut databases, database, container)?;

        let id = document_id(&document)?;
        let partition_key = resolve_partition_key(&state.properties, &document, partition_key)?;

        if state.position(&id, &partition_key).is_some() {
            return Err(DocumentStoreError::DocumentAlreadyExists(id, container.to_string()));
        }

        let item = self.stamp(id, partition_key, document);
        let response = ItemResponse::new(item.document.clone(), Some(item.etag.clone()));
        state.items.push(item);

        Ok(response)
    }

    async fn read_item(
        &self,
        database: &str,
        container: &str,
        id: &str,
        partition_key: &PartitionKey,
        _options: &RequestOptions,
    ) -> DocumentStoreResult<ItemResponse<Document>> {
        let databases = self.databases.read().await;
        let state = container_ref(&databases, database, container)?;

        let item = state
            .position(id, partition_key)
            .map(|index| &state.items[index])
            .ok_or_else(|| DocumentStoreError::DocumentNotFound(id.to_string(), container.to_string()))?;

        Ok(ItemResponse::new(item.document.clone(), Some(item.etag.clone())))
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
        let mut databases = self.databases.write().await;
        let state = container_mut(&mut databases, database, container)?;

        let body_id = document_id(&document)?;
        if body_id != id {
            return Err(DocumentStoreError::BadRequest(format!(
                "document id `{body_id}` does not match the replaced id `{id}`"
            )));
        }

        let partition_key = resolve_partition_key(&state.properties, &document, partition_key)?;
        let index = state
            .position(id, &partition_key)
            .ok_or_else(|| DocumentStoreError::DocumentNotFound(id.to_string(), container.to_string()))?;

        check_if_match(&state.items[index], options)?;

        let item = self.stamp(body_id, partition_key, document);
        let response = ItemResponse::new(item.document.clone(), Some(item.etag.clone()));
        state.items[index] = item;

        Ok(response)
    }

    async fn delete_item(
        &self,
        database: &str,
        container: &str,
        id: &str,
        partition_key: &PartitionKey,
        options: &RequestOptions,
    ) -> DocumentStoreResult<ItemResponse<Document>> {
        let mut databases = self.databases.write().await;
        let state = container_mut(&mut databases, database, container)?;

        let index = state
            .position(id, partition_key)
            .ok_or_else(|| DocumentStoreError::DocumentNotFound(id.to_string(), container.to_string()))?;

        check_if_match(&state.items[index], options)?;

        let item = state.items.remove(index);

        Ok(ItemResponse::new(item.document, Some(item.etag)))
    }

    async fn query_items(
        &self,
        database: &str,
        container: &str,
        query: &QueryDefinition,
        continuation: Option<&str>,
        options: &QueryOptions,
    ) -> DocumentStoreResult<FeedPage<Document>> {
        let query = SqlQuery::parse(query)?;

        let databases = self.databases.read().await;
        let state = container_ref(&databases, database, container)?;

        let rows = execute(state, &query, options.partition_key.as_ref());
        debug!(container, rows = rows.len(), "executed emulated query");

        paginate(rows, continuation, self.page_size(options))
    }

    async fn create_function(
        &self,
        database: &str,
        container: &str,
        function: FunctionProperties,
        _options: &RequestOptions,
    ) -> DocumentStoreResult<FunctionProperties> {
        if function.id.is_empty() {
            return Err(DocumentStoreError::BadRequest("function id must not be empty".to_string()));
        }

        let mut databases = self.databases.write().await;
        let state = container_mut(&mut databases, database, container)?;

        state.functions.insert(function.id.clone(), function.clone());

        Ok(function)
    }

    async fn delete_function(
        &self,
        database: &str,
        container: &str,
        id: &str,
        _options: &RequestOptions,
    ) -> DocumentStoreResult<()> {
        let mut databases = self.databases.write().await;
        let state = container_mut(&mut databases, database, container)?;

        if state.functions.remove(id).is_none() {
            return Err(DocumentStoreError::FunctionNotFound(id.to_string()));
        }

        Ok(())
    }
}

fn container_ref<'a>(
    databases: &'a DatabaseMap,
    database: &str,
    container: &str,
) -> DocumentStoreResult<&'a ContainerState> {
    databases
        .get(database)
        .ok_or_else(|| DocumentStoreError::DatabaseNotFound(database.to_string()))?
        .containers
        .get(container)
        .ok_or_else(|| DocumentStoreError::ContainerNotFound(container.to_string()))
}

fn container_mut<'a>(
    databases: &'a mut DatabaseMap,
    database: &str,
    container: &str,
) -> DocumentStoreResult<&'a mut ContainerState> {
    databases
        .get_mut(database)
        .ok_or_else(|| DocumentStoreError::DatabaseNotFound(database.to_string()))?
        .containers
        .get_mut(container)
        .ok_or_else(|| DocumentStoreError::ContainerNotFound(container.to_string()))
}

fn document_id(document: &Document) -> DocumentStoreResult<String> {
    match document.get(ID_FIELD) {
        Some(Bson::String(id)) if !id.is_empty() => Ok(id.clone()),
        _ => Err(DocumentStoreError::BadRequest(
            "document must carry a non-empty string `id`".to_string(),
        )),
    }
}

/// Reads the partition key value at the container's key path.
fn extract_partition_key(properties: &ContainerProperties, document: &Document) -> DocumentStoreResult<PartitionKey> {
    let mut scope = Some(document);
    let mut value = None;

    for segment in properties.partition_key_segments() {
        value = scope.and_then(|document| document.get(segment));
        scope = value.and_then(Bson::as_document);
    }

    match value {
        Some(value) => PartitionKey::try_from_bson(value.clone()),
        None => Ok(PartitionKey::null()),
    }
}

fn resolve_partition_key(
    properties: &ContainerProperties,
    document: &Document,
    explicit: Option<PartitionKey>,
) -> DocumentStoreResult<PartitionKey> {
    let extracted = extract_partition_key(properties, document)?;

    match explicit {
        Some(explicit) if explicit != extracted => Err(DocumentStoreError::BadRequest(format!(
            "partition key {explicit} does not match the document's value {extracted} at {}",
            properties.partition_key_path,
        ))),
        _ => Ok(extracted),
    }
}

fn check_if_match(item: &StoredItem, options: &RequestOptions) -> DocumentStoreResult<()> {
    match &options.if_match {
        Some(etag) if *etag != item.etag => Err(DocumentStoreError::PreconditionFailed(format!(
            "item {} has etag {}, expected {etag}",
            item.id, item.etag,
        ))),
        _ => Ok(()),
    }
}

fn execute(state: &ContainerState, query: &SqlQuery, partition_key: Option<&PartitionKey>) -> Vec<Document> {
    let mut rows = state
        .items
        .iter()
        .filter(|item| partition_key.is_none_or(|key| &item.partition_key == key))
        .filter(|item| {
            query
                .filter
                .as_ref()
                .is_none_or(|filter| RowEvaluator::new(&item.document).matches(filter))
        })
        .collect::<Vec<_>>();

    let output = match &query.projection {
        Projection::Count { alias } => {
            let mut row = Document::new();
            row.insert(alias.clone(), rows.len() as i64);
            vec![row]
        }
        Projection::All => {
            if let Some(order_by) = &query.order_by {
                rows.sort_by(|a, b| {
                    let ordering = sort_order(
                        RowEvaluator::new(&a.document).resolve(&order_by.path),
                        RowEvaluator::new(&b.document).resolve(&order_by.path),
                    );

                    match order_by.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                });
            }

            rows.into_iter().map(|item| item.document.clone()).collect()
        }
    };

    output
        .into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(usize::MAX))
        .collect()
}

/// Cuts one feed page out of a full result set.
///
/// The continuation token is the position of the next row.
fn paginate<T>(rows: Vec<T>, continuation: Option<&str>, page_size: usize) -> DocumentStoreResult<FeedPage<T>> {
    let start = match continuation {
        None => 0,
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| DocumentStoreError::BadRequest(format!("invalid continuation token `{token}`")))?,
    };

    let total = rows.len();
    let end = start.saturating_add(page_size).min(total);
    let items = rows
        .into_iter()
        .skip(start)
        .take(page_size)
        .collect();

    Ok(FeedPage::new(items, (end < total).then(|| end.to_string())))
}

/// Builder for [`InMemoryStore`] instances.
///
/// ```ignore
/// use cosmolayer_core::backend::StoreBackendBuilder;
/// use cosmolayer_memory::InMemoryStore;
///
/// let store = InMemoryStore::builder().with_max_page_size(10).build().await?;
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStoreBuilder {
    max_page_size: usize,
}

impl InMemoryStoreBuilder {
    /// Caps the number of items per feed page. Zero is treated as one.
    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }
}

impl Default for InMemoryStoreBuilder {
    fn default() -> Self {
        Self { max_page_size: DEFAULT_MAX_PAGE_SIZE }
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore { max_page_size: self.max_page_size, ..InMemoryStore::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_follow_positions() {
        let first = paginate((0..5).collect(), None, 2).unwrap();
        assert_eq!(first.items, [0, 1]);
        assert_eq!(first.continuation.as_deref(), Some("2"));

        let last = paginate((0..5).collect(), Some("4"), 2).unwrap();
        assert_eq!(last.items, [4]);
        assert!(!last.has_more_results());

        assert!(paginate(Vec::<i32>::new(), Some("nope"), 2).is_err());
    }

    #[test]
    fn nested_partition_key_paths_are_extracted() {
        let properties = ContainerProperties::new("orders", "/customer/region");
        let document = bson::doc! { "id": "o-1", "customer": { "region": "eu" } };

        assert_eq!(extract_partition_key(&properties, &document).unwrap(), PartitionKey::from("eu"));
        assert_eq!(
            extract_partition_key(&properties, &bson::doc! { "id": "o-2" }).unwrap(),
            PartitionKey::null(),
        );
        assert!(resolve_partition_key(&properties, &document, Some("us".into())).is_err());
    }
}
