//! Request and response shapes for the control surface

use serde::{Deserialize, Serialize};

use crate::observability::MetricsSnapshot;
use crate::store::WorkerState;

pub const GREETING: &str = "Hello, world\n";
pub const STORED: &str = "success: stored key";
pub const SHUTTING_DOWN: &str = "shutting down local endpoint...";

/// Query string of `GET /retrieve`
#[derive(Debug, Default, Deserialize)]
pub struct RetrieveQuery {
    pub ns: Option<String>,
    pub key: Option<String>,
}

/// Form body of `POST /store`
#[derive(Debug, Default, Deserialize)]
pub struct StoreForm {
    pub ns: Option<String>,
    pub key: Option<String>,
    pub val: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub worker_state: WorkerState,
    pub jobs: MetricsSnapshot,
    pub version: String,
}
