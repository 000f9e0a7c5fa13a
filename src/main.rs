use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod domain;
mod metrics;
mod query;
mod service;
mod store;

use config::AppConfig;
use domain::order::{OrderSearch, OrderStatus};
use metrics::Metrics;
use query::{group_flat, OrderQueryRepository};
use service::OrderQueryService;
use store::query_names::SELECT_ORDER_ITEMS;
use store::{InMemoryOrderStore, OrderQueryStore, OrderRepository, PgOrderStore};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    // Structured logging; RUST_LOG overrides the default filter
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_new(&config.log_filter)
                .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER)),
        )
        .init();

    tracing::info!("🚀 Starting order query service");

    // === 1. Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_host = config.metrics_host.clone();
    let metrics_port = config.metrics_port;
    actix_web::rt::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_registry, metrics_host, metrics_port).await {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    // === 2. Order store ===
    match &config.database {
        Some(database) => {
            tracing::info!("Connecting to PostgreSQL...");
            let store = PgOrderStore::connect(database, metrics.clone()).await?;

            // Every view below reads the same snapshot
            let scope = Arc::new(store.begin_read().await?);
            run_order_queries(scope.clone(), &metrics).await?;
            if let Ok(scope) = Arc::try_unwrap(scope) {
                scope.finish().await?;
            }
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory sample orders");
            let store = InMemoryOrderStore::with_sample_data(metrics.clone());
            run_order_queries(Arc::new(store), &metrics).await?;
        }
    }

    tracing::info!(
        "📊 Serving /metrics on {}:{}, press Ctrl-C to exit",
        config.metrics_host,
        config.metrics_port
    );
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down");
    Ok(())
}

/// Run every read view once and log what each one cost
async fn run_order_queries<S>(store: Arc<S>, metrics: &Metrics) -> anyhow::Result<()>
where
    S: OrderQueryStore + OrderRepository,
{
    let repository = OrderQueryRepository::new(store.clone());
    let service = OrderQueryService::new(store);

    let before = metrics.total_queries();
    let naive = repository.find_order_query_dtos().await?;
    tracing::info!(
        orders = naive.len(),
        queries = metrics.total_queries() - before,
        item_queries = metrics.query_count(SELECT_ORDER_ITEMS),
        "Per-order item fetch"
    );

    let before = metrics.total_queries();
    let optimized = repository.find_all_by_dto_optimization().await?;
    tracing::info!(
        orders = optimized.len(),
        queries = metrics.total_queries() - before,
        "Batched item fetch"
    );

    let before = metrics.total_queries();
    let flat = repository.find_all_by_dto_flat().await?;
    tracing::info!(
        rows = flat.len(),
        queries = metrics.total_queries() - before,
        "Flat join"
    );

    let grouped = group_flat(flat);
    if grouped.len() != optimized.iter().filter(|o| !o.order_items.is_empty()).count() {
        tracing::warn!(grouped = grouped.len(), "Grouped flat rows disagree with batched result");
    }

    let views = service.orders_query_v2().await?;
    tracing::info!(orders = views.len(), "Service view");

    let cancelled = service
        .orders_query(&OrderSearch::new().with_status(OrderStatus::Cancel))
        .await?;
    tracing::info!(orders = cancelled.len(), "Cancelled orders");

    let by_member = service
        .orders_query(&OrderSearch::new().with_member_name("userA"))
        .await?;
    tracing::info!(orders = by_member.len(), member = "userA", "Orders by member name");

    tracing::info!("✅ Orders:\n{}", serde_json::to_string_pretty(&optimized)?);

    Ok(())
}
