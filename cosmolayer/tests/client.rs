use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use bson::Document as BsonDocument;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use cosmolayer::{memory::InMemoryStore, prelude::*};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
struct Order {
    #[document(id)]
    id: String,
    #[document(partition_key)]
    customer: String,
    total: i64,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
struct Sku {
    #[document(id, rename = "code")]
    #[serde(rename = "code")]
    sku: String,
}

fn order(n: usize, customer: &str) -> Order {
    Order { id: format!("o-{n:02}"), customer: customer.to_string(), total: n as i64, tags: Vec::new() }
}

async fn orders<B: StoreBackend>(backend: B) -> DocumentClient<B, Order> {
    let client = DocumentClient::new(backend, "Shop", "Orders");
    let cancel = CancellationToken::new();

    client.ensure_database_exists(None, None, &cancel).await.unwrap();
    client
        .ensure_container_exists(ContainerProperties::new("ignored", "/customer"), None, None, &cancel)
        .await
        .unwrap();

    client
}

async fn seeded(max_page_size: usize, count: usize) -> DocumentClient<InMemoryStore, Order> {
    let backend = InMemoryStore::builder().with_max_page_size(max_page_size).build().await.unwrap();
    let client = orders(backend).await;
    let cancel = CancellationToken::new();

    for n in 1..=count {
        let customer = if n % 2 == 0 { "ada" } else { "bob" };
        client.insert(&order(n, customer), None, None, &cancel).await.unwrap();
    }

    client
}

fn ids(orders: &[Order]) -> Vec<String> {
    orders.iter().map(|order| order.id.clone()).collect()
}

#[test]
fn derive_reads_marked_fields() {
    let sample = order(1, "ada");
    assert_eq!(sample.id(), "o-01");
    assert_eq!(sample.partition_key(), PartitionKey::from("ada"));
    assert_eq!(Order::ID_FIELD, "id");

    let sku = Sku { sku: "A-1".into() };
    assert_eq!(sku.id(), "A-1");
    assert_eq!(sku.partition_key(), PartitionKey::from("A-1"));
    assert_eq!(Sku::ID_FIELD, "code");
}

#[tokio::test]
async fn provisioning_binds_the_client_container() {
    let client = seeded(10, 0).await;
    let cancel = CancellationToken::new();

    let container = client.read_container(None, &cancel).await.unwrap();
    assert_eq!(container.id, "Orders");
    assert_eq!(container.partition_key_path, "/customer");

    let containers = client.list_containers(&cancel).await.unwrap();
    assert_eq!(containers.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), ["Orders"]);
}

#[tokio::test]
async fn insert_then_read_round_trips() {
    let client = seeded(10, 0).await;
    let cancel = CancellationToken::new();
    let gift = Order { tags: vec!["gift".into()], ..order(1, "ada") };

    let stored = client.insert(&gift, None, None, &cancel).await.unwrap();
    assert_eq!(stored, gift);

    let read = client.read_item("o-01", &PartitionKey::from("ada"), None, &cancel).await.unwrap();
    assert_eq!(read.resource, gift);
    assert!(read.etag.is_some());

    let err = client.insert(&gift, None, None, &cancel).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn replace_honours_etags() {
    let client = seeded(10, 1).await;
    let cancel = CancellationToken::new();
    let key = PartitionKey::from("bob");

    let read = client.read_item("o-01", &key, None, &cancel).await.unwrap();
    let etag = read.etag.unwrap();
    let updated = Order { total: 42, ..read.resource };

    let conditional = RequestOptions::new().with_if_match(etag);
    client.replace_item("o-01", &updated, None, Some(&conditional), &cancel).await.unwrap();

    let err = client
        .replace_item("o-01", &updated, None, Some(&conditional), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::PreconditionFailed(_)));

    let err = client
        .replace_item("o-99", &order(99, "bob"), None, None, &cancel)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn remove_returns_the_prior_value() {
    let client = seeded(10, 2).await;
    let cancel = CancellationToken::new();
    let key = PartitionKey::from("ada");

    let removed = client.remove_item("o-02", &key, None, &cancel).await.unwrap();
    assert_eq!(removed.total, 2);

    let err = client.remove_item("o-02", &key, None, &cancel).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(client.get_total_count(None, &cancel).await.unwrap(), 1);
}

#[tokio::test]
async fn predicates_page_through_continuations() {
    let client = seeded(2, 9).await;
    let cancel = CancellationToken::new();
    let filter = Filter::eq("customer", "bob");

    let first = client.get_items(None, Some(&filter), None, &cancel).await.unwrap();
    assert_eq!(ids(&first.items), ["o-01", "o-03"]);
    assert!(first.has_more_results());

    let second = client
        .get_items(None, Some(&filter), first.continuation.as_deref(), &cancel)
        .await
        .unwrap();
    assert_eq!(ids(&second.items), ["o-05", "o-07"]);

    let everything = client.get_items(None, None, None, &cancel).await.unwrap();
    assert_eq!(everything.items.len(), 2);
}

#[tokio::test]
async fn unsupported_predicates_fail_before_any_request() {
    let client = seeded(2, 3).await;
    let cancel = CancellationToken::new();

    let err = client
        .get_items(None, Some(&Filter::or([])), None, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::UnsupportedPredicate(_)));
}

#[tokio::test]
async fn paged_reads_drain_every_server_page() {
    for max_page_size in [1, 2, 3, 7, 100] {
        let client = seeded(max_page_size, 25).await;
        let cancel = CancellationToken::new();

        let third = client.get_items_paged(3, 10, None, &cancel).await.unwrap();
        assert_eq!(
            ids(&third),
            (21..=25).map(|n| format!("o-{n:02}")).collect::<Vec<_>>(),
            "server page size {max_page_size}",
        );

        let second = client.get_items_paged(2, 10, None, &cancel).await.unwrap();
        assert_eq!(ids(&second), (11..=20).map(|n| format!("o-{n:02}")).collect::<Vec<_>>());

        assert!(client.get_items_paged(4, 10, None, &cancel).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn paged_reads_validate_before_any_request() {
    let client = seeded(2, 0).await;
    let cancel = CancellationToken::new();

    for (page, page_size) in [(0, 10), (1, 0), (-2, 5)] {
        let err = client.get_items_paged(page, page_size, None, &cancel).await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::Validation(_)));
    }
}

#[tokio::test]
async fn counts_follow_the_container() {
    let client = seeded(3, 0).await;
    let cancel = CancellationToken::new();

    assert_eq!(client.get_total_count(None, &cancel).await.unwrap(), 0);

    for n in 1..=11 {
        client.insert(&order(n, "ada"), None, None, &cancel).await.unwrap();
    }
    assert_eq!(client.get_total_count(None, &cancel).await.unwrap(), 11);

    let scoped = QueryOptions::new().with_partition_key("bob");
    assert_eq!(client.get_total_count(Some(&scoped), &cancel).await.unwrap(), 0);
}

#[tokio::test]
async fn structured_queries_sort_and_window() {
    let client = seeded(2, 10).await;
    let cancel = CancellationToken::new();

    let query = Query::builder()
        .filter(Filter::eq("customer", "ada"))
        .sort("total", SortDirection::Desc)
        .offset(1)
        .limit(3)
        .build();

    let rows = client.query(&query, None, &cancel).await.unwrap();
    assert_eq!(ids(&rows), ["o-08", "o-06", "o-04"]);

    let pages = client
        .query_pages(QueryDefinition::select_all(), None, &cancel)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();
    assert_eq!(pages.len(), 5);
    assert!(pages.iter().all(|page| page.items.len() == 2));
}

#[tokio::test]
async fn functions_register_and_unregister() {
    let client = seeded(2, 0).await;
    let cancel = CancellationToken::new();

    let created = client
        .create_function("discount", "function discount(x) { return x * 0.9; }", None, &cancel)
        .await
        .unwrap();
    assert_eq!(created.id, "discount");

    client
        .create_function("discount", "function discount(x) { return x * 0.8; }", None, &cancel)
        .await
        .unwrap();
    client.delete_function("discount", None, &cancel).await.unwrap();

    let err = client.delete_function("discount", None, &cancel).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn clients_share_one_backend() {
    let backend = Arc::new(InMemoryStore::new());
    let writer = orders(Arc::clone(&backend)).await;
    let reader: DocumentClient<_, Order> = DocumentClient::new(Arc::clone(&backend), "Shop", "Orders");
    let cancel = CancellationToken::new();

    let batch = (1..=8).map(|n| order(n, "ada")).collect::<Vec<_>>();
    let inserts = batch.iter().map(|order| writer.insert(order, None, None, &cancel));
    futures::future::try_join_all(inserts).await.unwrap();

    assert_eq!(reader.get_total_count(None, &cancel).await.unwrap(), 8);
}

#[tokio::test]
async fn cancelled_tokens_stop_before_the_request() {
    let client = seeded(2, 3).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client.insert(&order(4, "ada"), None, None, &cancel).await.unwrap_err();
    assert_eq!(err, DocumentStoreError::Cancelled);
    assert_eq!(client.get_total_count(None, &CancellationToken::new()).await.unwrap(), 3);
}

/// Forwards to an inner backend and cancels a token after a number of query pages.
#[derive(Debug)]
struct CancelAfterPages {
    inner: InMemoryStore,
    pages: AtomicUsize,
    limit: usize,
    token: CancellationToken,
}

#[async_trait]
impl StoreBackend for CancelAfterPages {
    async fn create_database_if_not_exists(
        &self,
        database: &str,
        throughput: Option<ThroughputProperties>,
        options: &RequestOptions,
    ) -> DocumentStoreResult<DatabaseProperties> {
        self.inner.create_database_if_not_exists(database, throughput, options).await
    }

    async fn create_container_if_not_exists(
        &self,
        database: &str,
        properties: ContainerProperties,
        throughput: Option<ThroughputProperties>,
        options: &RequestOptions,
    ) -> DocumentStoreResult<ContainerProperties> {
        self.inner.create_container_if_not_exists(database, properties, throughput, options).await
    }

    async fn read_container(
        &self,
        database: &str,
        container: &str,
        options: &RequestOptions,
    ) -> DocumentStoreResult<ContainerProperties> {
        self.inner.read_container(database, container, options).await
    }

    async fn query_containers(
        &self,
        database: &str,
        continuation: Option<&str>,
        options: &QueryOptions,
    ) -> DocumentStoreResult<FeedPage<ContainerProperties>> {
        self.inner.query_containers(database, continuation, options).await
    }

    async fn create_item(
        &self,
        database: &str,
        container: &str,
        partition_key: Option<PartitionKey>,
        document: BsonDocument,
        options: &RequestOptions,
    ) -> DocumentStoreResult<ItemResponse<BsonDocument>> {
        self.inner.create_item(database, container, partition_key, document, options).await
    }

    async fn read_item(
        &self,
        database: &str,
        container: &str,
        id: &str,
        partition_key: &PartitionKey,
        options: &RequestOptions,
    ) -> DocumentStoreResult<ItemResponse<BsonDocument>> {
        self.inner.read_item(database, container, id, partition_key, options).await
    }

    async fn replace_item(
        &self,
        database: &str,
        container: &str,
        id: &str,
        partition_key: Option<PartitionKey>,
        document: BsonDocument,
        options: &RequestOptions,
    ) -> DocumentStoreResult<ItemResponse<BsonDocument>> {
        self.inner.replace_item(database, container, id, partition_key, document, options).await
    }

    async fn delete_item(
        &self,
        database: &str,
        container: &str,
        id: &str,
        partition_key: &PartitionKey,
        options: &RequestOptions,
    ) -> DocumentStoreResult<ItemResponse<BsonDocument>> {
        self.inner.delete_item(database, container, id, partition_key, options).await
    }

    async fn query_items(
        &self,
        database: &str,
        container: &str,
        query: &QueryDefinition,
        continuation: Option<&str>,
        options: &QueryOptions,
    ) -> DocumentStoreResult<FeedPage<BsonDocument>> {
        let page = self.inner.query_items(database, container, query, continuation, options).await?;

        if self.pages.fetch_add(1, Ordering::SeqCst) + 1 >= self.limit {
            self.token.cancel();
        }

        Ok(page)
    }

    async fn create_function(
        &self,
        database: &str,
        container: &str,
        function: FunctionProperties,
        options: &RequestOptions,
    ) -> DocumentStoreResult<FunctionProperties> {
        self.inner.create_function(database, container, function, options).await
    }

    async fn delete_function(
        &self,
        database: &str,
        container: &str,
        id: &str,
        options: &RequestOptions,
    ) -> DocumentStoreResult<()> {
        self.inner.delete_function(database, container, id, options).await
    }
}

#[tokio::test]
async fn cancellation_between_pages_discards_partial_results() {
    let inner = InMemoryStore::builder().with_max_page_size(2).build().await.unwrap();
    let cancel = CancellationToken::new();
    let backend = CancelAfterPages { inner, pages: AtomicUsize::new(0), limit: 2, token: cancel.clone() };
    let client = orders(backend).await;

    for n in 1..=10 {
        client.insert(&order(n, "ada"), None, None, &cancel).await.unwrap();
    }

    let err = client.get_items_paged(1, 10, None, &cancel).await.unwrap_err();
    assert_eq!(err, DocumentStoreError::Cancelled);
    assert_eq!(client.backend().pages.load(Ordering::SeqCst), 2);
}
