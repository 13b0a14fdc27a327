//! Loopback HTTP control surface
//!
//! | Route            | Effect                                        |
//! |------------------|-----------------------------------------------|
//! | `GET /`          | greeting                                      |
//! | `GET /retrieve`  | read `key` from partition `ns`                |
//! | `POST /store`    | write form fields `ns`, `key`, `val`          |
//! | `POST /shutdown` | close the store, then stop the listener       |
//! | `GET /health`    | worker state and job counters as JSON         |

mod error;
pub mod models;
mod server;
pub mod services;
pub mod state;

pub use error::ApiError;
pub use server::{router, run};
pub use state::AppState;
