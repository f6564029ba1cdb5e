//! Verifies that product store operations open spans for themselves and for the
//! client calls they make, and that captured failures are logged.

use std::sync::{Arc, Mutex};

use tracing::{Level, Subscriber};
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

use cosmolayer::{memory::InMemoryStore, prelude::*};
use cosmolayer_catalog::{Product, ProductClient, ProductStore, ProvisioningConfig};

#[derive(Clone, Default)]
struct SpanCollector {
    spans: Arc<Mutex<Vec<String>>>,
    warnings: Arc<Mutex<usize>>,
}

impl<S> tracing_subscriber::Layer<S> for SpanCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        _attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            self.spans.lock().unwrap().push(span.name().to_owned());
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            *self.warnings.lock().unwrap() += 1;
        }
    }
}

async fn product_store() -> ProductStore<ProductClient<InMemoryStore>> {
    let backend = InMemoryStore::builder().build().await.unwrap();
    ProductStore::new(ProductClient::new(backend))
}

#[tokio::test]
async fn get_spans_cover_count_and_page_reads() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let store = product_store().await;
    store.bootstrap(&ProvisioningConfig::default()).await.unwrap();
    store.add(Product::with_id("p-1", "Lamp", "Desk lamp", "ops")).await.unwrap();
    let _ = store.get(1, 10).await.unwrap();

    let recorded = spans.lock().unwrap();
    for name in ["bootstrap", "add", "insert", "get", "get_total_count", "get_items_paged"] {
        assert!(recorded.iter().any(|s| s == name), "expected a '{name}' span, got: {recorded:?}");
    }
}

#[tokio::test]
async fn find_by_id_opens_a_query_span() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let store = product_store().await;
    store.bootstrap(&ProvisioningConfig::default()).await.unwrap();
    let _ = store.find_by_id("p-1").await.unwrap();

    let recorded = spans.lock().unwrap();
    assert!(recorded.iter().any(|s| s == "find_by_id"), "expected a 'find_by_id' span, got: {recorded:?}");
    assert!(recorded.iter().any(|s| s == "query"), "expected a 'query' span, got: {recorded:?}");
}

#[tokio::test]
async fn captured_failures_are_logged_as_warnings() {
    let collector = SpanCollector::default();
    let warnings = Arc::clone(&collector.warnings);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let store = product_store().await;
    let missing = store.find_by_id("p-1").await.unwrap();

    assert!(missing.is_not_found());
    assert!(*warnings.lock().unwrap() >= 1);
}
