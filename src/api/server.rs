use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::{
    services::{health, index, retrieve, shutdown, store_value},
    state::AppState,
};
use crate::config::Config;
use crate::crypto::KeyFileProcessor;
use crate::observability::Metrics;
use crate::queue::{JsonDecoder, QueueConsumer};
use crate::store::Store;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Control-surface routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/retrieve", get(retrieve))
        .route("/store", post(store_value))
        .route("/shutdown", post(shutdown))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Open the store, start the queue consumer and serve until shutdown
///
/// Shutdown is triggered by Ctrl+C, SIGTERM or `POST /shutdown`. The store
/// is closed and the consumer joined before returning.
pub async fn run(config: Config) -> Result<(), AnyError> {
    let store = Arc::new(
        Store::open(&config.store).map_err(|e| format!("Failed to open store: {}", e))?,
    );

    let listener = TcpListener::bind(config.server.bind_addr).await?;

    let processor = KeyFileProcessor::from_config(&config.crypto);
    if !processor.key_path().exists() {
        warn!(
            path = %processor.key_path().display(),
            "Secret key file not found; encrypt and decrypt jobs will fail until it exists"
        );
    }

    let metrics = Arc::new(Metrics::new());
    let consumer = QueueConsumer::new(
        store.clone(),
        Arc::new(JsonDecoder),
        Arc::new(processor),
        metrics.clone(),
        &config.worker,
    );
    let worker = consumer.spawn()?;

    let state = AppState::new(store.clone(), metrics);
    let app = router(state.clone());

    info!(address = %config.server.bind_addr, "localtasks listening");

    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(state.shutdown.clone()))
        .await;

    info!("Stopping queue consumer");
    let joined = tokio::task::spawn_blocking(move || {
        store.close();
        worker.join().is_ok()
    })
    .await?;
    if !joined {
        error!("Queue consumer panicked");
    }

    served?;
    Ok(())
}

async fn shutdown_signal(requested: Arc<Notify>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = requested.notified() => {},
    }

    info!("Shutdown signal received");
}
