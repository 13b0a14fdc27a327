use std::sync::Arc;

use tokio::sync::Notify;

use crate::observability::Metrics;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub metrics: Arc<Metrics>,
    /// Fired by `POST /shutdown` once the store is closed
    pub shutdown: Arc<Notify>,
}

impl AppState {
    pub fn new(store: Arc<Store>, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            metrics,
            shutdown: Arc::new(Notify::new()),
        }
    }
}
