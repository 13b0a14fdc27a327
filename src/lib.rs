pub mod api;
pub mod config;
pub mod crypto;
pub mod observability;
pub mod queue;
pub mod store;
