use bson::{Bson, doc};

use cosmolayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::PartitionKey,
    error::DocumentStoreError,
    options::{QueryOptions, RequestOptions},
    query::{Filter, Query, SortDirection},
    resource::{ContainerProperties, FunctionProperties},
    translate::{QueryDefinition, SqlQueryTranslator},
};
use cosmolayer_memory::{InMemoryStore, store::ETAG_FIELD};

const DB: &str = "Shop";
const ORDERS: &str = "Orders";

async fn provisioned(max_page_size: usize) -> InMemoryStore {
    let store = InMemoryStore::builder()
        .with_max_page_size(max_page_size)
        .build()
        .await
        .unwrap();
    let options = RequestOptions::default();

    store.create_database_if_not_exists(DB, None, &options).await.unwrap();
    store
        .create_container_if_not_exists(DB, ContainerProperties::new(ORDERS, "/customer"), None, &options)
        .await
        .unwrap();

    store
}

async fn seed(store: &InMemoryStore, count: usize) {
    for n in 1..=count {
        let customer = if n % 2 == 0 { "ada" } else { "bob" };
        store
            .create_item(
                DB,
                ORDERS,
                None,
                doc! { "id": format!("o-{n:02}"), "customer": customer, "total": n as i64 },
                &RequestOptions::default(),
            )
            .await
            .unwrap();
    }
}

async fn drain(store: &InMemoryStore, query: &QueryDefinition, options: &QueryOptions) -> Vec<bson::Document> {
    let mut items = Vec::new();
    let mut continuation: Option<String> = None;

    loop {
        let page = store
            .query_items(DB, ORDERS, query, continuation.as_deref(), options)
            .await
            .unwrap();
        assert!(page.items.len() <= store.max_page_size());

        let more = page.has_more_results();
        items.extend(page.items);
        if !more {
            return items;
        }
        continuation = page.continuation;
    }
}

fn ids(items: &[bson::Document]) -> Vec<&str> {
    items.iter().map(|item| item.get_str("id").unwrap()).collect()
}

#[tokio::test]
async fn provisioning_is_idempotent() {
    let store = provisioned(10).await;
    let options = RequestOptions::default();

    let again = store
        .create_container_if_not_exists(DB, ContainerProperties::new(ORDERS, "/other"), None, &options)
        .await
        .unwrap();
    assert_eq!(again.partition_key_path, "/customer");

    store.create_database_if_not_exists(DB, None, &options).await.unwrap();
    let containers = store.query_containers(DB, None, &QueryOptions::default()).await.unwrap();
    assert_eq!(containers.items.len(), 1);
}

#[tokio::test]
async fn missing_resources_are_reported() {
    let store = InMemoryStore::new();
    let options = RequestOptions::default();

    let err = store
        .create_container_if_not_exists("Nowhere", ContainerProperties::new(ORDERS, "/id"), None, &options)
        .await
        .unwrap_err();
    assert_eq!(err, DocumentStoreError::DatabaseNotFound("Nowhere".into()));

    store.create_database_if_not_exists(DB, None, &options).await.unwrap();
    let err = store.read_container(DB, ORDERS, &options).await.unwrap_err();
    assert_eq!(err, DocumentStoreError::ContainerNotFound(ORDERS.into()));
}

#[tokio::test]
async fn ids_are_unique_per_partition() {
    let store = provisioned(10).await;
    let options = RequestOptions::default();

    store.create_item(DB, ORDERS, None, doc! { "id": "o-1", "customer": "ada" }, &options).await.unwrap();
    store.create_item(DB, ORDERS, None, doc! { "id": "o-1", "customer": "bob" }, &options).await.unwrap();

    let err = store
        .create_item(DB, ORDERS, None, doc! { "id": "o-1", "customer": "ada" }, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::DocumentAlreadyExists(..)));
    assert!(err.is_conflict());

    let err = store
        .create_item(DB, ORDERS, Some("carol".into()), doc! { "id": "o-2", "customer": "ada" }, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::BadRequest(_)));
}

#[tokio::test]
async fn etags_guard_replace_and_delete() {
    let store = provisioned(10).await;
    let options = RequestOptions::default();
    let key = PartitionKey::from("ada");

    let created = store
        .create_item(DB, ORDERS, None, doc! { "id": "o-1", "customer": "ada", "total": 5 }, &options)
        .await
        .unwrap();
    let etag = created.etag.clone().unwrap();
    assert_eq!(created.resource.get_str(ETAG_FIELD).unwrap(), etag);

    let replaced = store
        .replace_item(
            DB,
            ORDERS,
            "o-1",
            None,
            doc! { "id": "o-1", "customer": "ada", "total": 7 },
            &RequestOptions::new().with_if_match(etag.clone()),
        )
        .await
        .unwrap();
    assert_ne!(replaced.etag.as_deref(), Some(etag.as_str()));

    let err = store
        .replace_item(
            DB,
            ORDERS,
            "o-1",
            None,
            doc! { "id": "o-1", "customer": "ada", "total": 9 },
            &RequestOptions::new().with_if_match(etag.clone()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::PreconditionFailed(_)));

    let err = store
        .delete_item(DB, ORDERS, "o-1", &key, &RequestOptions::new().with_if_match(etag))
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::PreconditionFailed(_)));

    let read = store.read_item(DB, ORDERS, "o-1", &key, &options).await.unwrap();
    assert_eq!(read.resource.get_i32("total").unwrap(), 7);

    let removed = store.delete_item(DB, ORDERS, "o-1", &key, &options).await.unwrap();
    assert_eq!(removed.resource.get_i32("total").unwrap(), 7);

    let err = store.read_item(DB, ORDERS, "o-1", &key, &options).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn replacing_a_missing_item_is_not_found() {
    let store = provisioned(10).await;

    let err = store
        .replace_item(DB, ORDERS, "o-9", None, doc! { "id": "o-9", "customer": "ada" }, &RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, DocumentStoreError::DocumentNotFound("o-9".into(), ORDERS.into()));
}

#[tokio::test]
async fn feeds_are_split_into_pages() {
    let store = provisioned(4).await;
    seed(&store, 10).await;

    let first = store
        .query_items(DB, ORDERS, &QueryDefinition::select_all(), None, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(ids(&first.items), ["o-01", "o-02", "o-03", "o-04"]);
    assert!(first.has_more_results());

    let all = drain(&store, &QueryDefinition::select_all(), &QueryOptions::default()).await;
    assert_eq!(all.len(), 10);

    let small = drain(&store, &QueryDefinition::select_all(), &QueryOptions::new().with_max_item_count(3)).await;
    assert_eq!(ids(&small), ids(&all));
}

#[tokio::test]
async fn offset_limit_windows_span_pages() {
    let store = provisioned(2).await;
    seed(&store, 10).await;

    let window = drain(&store, &QueryDefinition::page(3, 5), &QueryOptions::default()).await;
    assert_eq!(ids(&window), ["o-04", "o-05", "o-06", "o-07", "o-08"]);

    let past_end = drain(&store, &QueryDefinition::page(20, 5), &QueryOptions::default()).await;
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn count_projects_the_total() {
    let store = provisioned(2).await;

    let empty = drain(&store, &QueryDefinition::count(), &QueryOptions::default()).await;
    assert_eq!(empty, [doc! { "Total": 0_i64 }]);

    seed(&store, 7).await;
    let counted = drain(&store, &QueryDefinition::count(), &QueryOptions::default()).await;
    assert_eq!(counted[0].get("Total"), Some(&Bson::Int64(7)));

    let scoped = drain(&store, &QueryDefinition::count(), &QueryOptions::new().with_partition_key("ada")).await;
    assert_eq!(scoped[0].get("Total"), Some(&Bson::Int64(3)));
}

#[tokio::test]
async fn translated_queries_filter_and_sort() {
    let store = provisioned(3).await;
    seed(&store, 10).await;

    let query = Query::builder()
        .filter(Filter::eq("customer", "ada").and(Filter::gte("total", 4)))
        .sort("total", SortDirection::Desc)
        .build();
    let definition = SqlQueryTranslator::translate(&query).unwrap();

    let rows = drain(&store, &definition, &QueryOptions::default()).await;
    assert_eq!(ids(&rows), ["o-10", "o-08", "o-06", "o-04"]);

    let none = SqlQueryTranslator::translate_filter(Some(&Filter::starts_with("id", "x-"))).unwrap();
    assert!(drain(&store, &none, &QueryOptions::default()).await.is_empty());
}

#[tokio::test]
async fn malformed_queries_are_bad_requests() {
    let store = provisioned(3).await;

    let err = store
        .query_items(DB, ORDERS, &QueryDefinition::new("SELECT VALUE c FROM c"), None, &QueryOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::BadRequest(_)));

    let err = store
        .query_items(DB, ORDERS, &QueryDefinition::select_all(), Some("later"), &QueryOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::BadRequest(_)));
}

#[tokio::test]
async fn functions_are_replaced_and_removed() {
    let store = provisioned(3).await;
    let options = RequestOptions::default();
    let tax = |body: &str| FunctionProperties { id: "tax".into(), body: body.into() };

    store.create_function(DB, ORDERS, tax("function tax(x) { return x * 0.2; }"), &options).await.unwrap();
    store.create_function(DB, ORDERS, tax("function tax(x) { return x * 0.25; }"), &options).await.unwrap();
    store.delete_function(DB, ORDERS, "tax", &options).await.unwrap();

    let err = store.delete_function(DB, ORDERS, "tax", &options).await.unwrap_err();
    assert_eq!(err, DocumentStoreError::FunctionNotFound("tax".into()));
}
