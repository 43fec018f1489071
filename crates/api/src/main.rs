//! Order service entry point.
//!
//! Startup: configuration, tracing and metrics, order store (PostgreSQL when
//! `DATABASE_URL` is set, in-memory otherwise), listener bind, cache warm-up,
//! queue consumer, HTTP server. Shutdown runs in reverse: the HTTP server stops, the consumer
//! is signalled and joined, and only then is the database pool closed.

use std::error::Error;
use std::sync::Arc;

use api::config::Config;
use cache::OrderCache;
use domain::OrderService;
use ingest::{FailurePolicy, InMemoryDeadLetterSink, QueueConsumer};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderRepository, OrderRepository, PostgresOrderRepository};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Runs the service on top of `repository` until a shutdown signal arrives.
async fn serve<R: OrderRepository + 'static>(
    config: &Config,
    repository: R,
    metrics_handle: PrometheusHandle,
) -> Result<(), Box<dyn Error>> {
    // Bind first so a taken port fails before any background work starts.
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let order_service = Arc::new(OrderService::new(repository, OrderCache::new()));

    if let Err(err) = order_service.warm_cache().await {
        tracing::warn!(error = %err, "failed to warm cache, starting empty");
    }

    let (producer, source) = ingest::channel(config.ingest_queue_capacity);
    let mut consumer = QueueConsumer::new(source, Arc::clone(&order_service))
        .with_read_timeout(config.ingest_read_timeout)
        .with_policy(config.failure_policy);
    if config.failure_policy == FailurePolicy::DeadLetter {
        consumer = consumer.with_dead_letter_sink(Arc::new(InMemoryDeadLetterSink::new()));
    }

    tracing::info!(policy = %consumer.policy(), "starting queue consumer");
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_task = tokio::spawn(async move { consumer.run(shutdown_rx).await });

    let app = api::create_app(api::create_state(order_service, producer), metrics_handle);

    tracing::info!(%addr, "starting HTTP server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("HTTP server stopped");

    // The consumer may already have stopped on its own.
    let _ = shutdown_tx.send(true);
    match consumer_task.await {
        Ok(snapshot) => tracing::info!(processed = snapshot.processed, "queue consumer joined"),
        Err(err) => tracing::error!(error = %err, "queue consumer task failed"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 1. Load configuration
    let config = Config::from_env();

    // 2. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 3. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 4. Pick the order store and run until shutdown
    match config.database_url.as_deref() {
        Some(database_url) => {
            let repository =
                PostgresOrderRepository::connect(database_url, config.database_max_connections)
                    .await?;
            tracing::info!("connected to PostgreSQL");

            if let Err(err) = repository.run_migrations().await {
                tracing::warn!(error = %err, "failed to run migrations");
            }

            let result = serve(&config, repository.clone(), metrics_handle).await;

            repository.close().await;
            tracing::info!("database pool closed");
            result?;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory order store");
            serve(&config, InMemoryOrderRepository::new(), metrics_handle).await?;
        }
    }

    tracing::info!("server shut down gracefully");
    Ok(())
}
