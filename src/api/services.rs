use axum::{
    Form, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use super::{
    error::ApiError,
    models::{GREETING, HealthResponse, RetrieveQuery, SHUTTING_DOWN, STORED, StoreForm},
    state::AppState,
};
use crate::store::{Namespace, WorkerState, check_key};

/// Liveness probe (GET /)
pub async fn index() -> &'static str {
    GREETING
}

/// Read a value (GET /retrieve?ns=&key=)
///
/// A missing or empty `ns` selects the default partition.
pub async fn retrieve(
    State(state): State<AppState>,
    Query(query): Query<RetrieveQuery>,
) -> Result<String, ApiError> {
    let key = store_key(query.key)?;
    let ns = namespace(query.ns.as_deref())?;

    state
        .store
        .find(ns, key.as_bytes())
        .map(|value| String::from_utf8_lossy(&value).into_owned())
        .ok_or(ApiError::KeyNotFound)
}

/// Write a value (POST /store, form fields `ns`, `key`, `val`)
///
/// Writing into `cryptojobs` enqueues a job for the queue consumer.
pub async fn store_value(
    State(state): State<AppState>,
    Form(form): Form<StoreForm>,
) -> Result<&'static str, ApiError> {
    let key = store_key(form.key)?;
    let value = form.val.ok_or(ApiError::MissingParameter("val"))?;
    let ns = namespace(form.ns.as_deref())?;

    if state.store.save(ns, key.as_bytes(), value.as_bytes()) {
        Ok(STORED)
    } else {
        Err(ApiError::StoreFailed)
    }
}

/// Close the store and stop the listener (POST /shutdown)
///
/// Closing blocks until the queue consumer leaves its scan, so it runs on
/// the blocking pool. Repeated calls are harmless.
pub async fn shutdown(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    info!("Shutdown requested over HTTP");

    let store = state.store.clone();
    let closed = tokio::task::spawn_blocking(move || store.close()).await?;
    if !closed {
        info!("Store was already closed");
    }

    state.shutdown.notify_one();
    Ok(SHUTTING_DOWN)
}

/// Health check endpoint (GET /health)
///
/// Returns 503 Service Unavailable once shutdown has begun.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let worker_state = state.store.state();
    let (status_code, status) = match worker_state {
        WorkerState::Running => (StatusCode::OK, "healthy"),
        WorkerState::Stopping | WorkerState::Stopped => {
            (StatusCode::SERVICE_UNAVAILABLE, "shutting_down")
        }
    };

    let response = HealthResponse {
        status: status.to_string(),
        worker_state,
        jobs: state.metrics.snapshot(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ApiError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::MissingParameter(name))
}

/// A present key the store can hold
fn store_key(value: Option<String>) -> Result<String, ApiError> {
    let key = required(value, "key")?;
    check_key(key.as_bytes()).map_err(|_| ApiError::InvalidKey(key.len()))?;
    Ok(key)
}

/// Validate a partition name, keeping the raw form the store expects
fn namespace(ns: Option<&str>) -> Result<Option<&str>, ApiError> {
    match Namespace::resolve(ns) {
        Some(_) => Ok(ns),
        None => Err(ApiError::UnknownPartition(
            ns.unwrap_or_default().to_string(),
        )),
    }
}
