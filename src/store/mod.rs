//! Fjall-based persistent key-value store with a job queue partition
//!
//! The store owns a single Fjall keyspace with two declared partitions (see
//! [`namespace`]): the default partition for general records, and the
//! `cryptojobs` partition the queue worker drains.
//!
//! ## Lifecycle
//!
//! The store moves through [`WorkerState`] exactly once:
//!
//! - `Running`: normal operation
//! - `Stopping`: set by [`Store::prep_for_shutdown`]; the queue worker
//!   leaves its scan and no new scans start
//! - `Stopped`: set by [`Store::close`] after the journal is flushed and
//!   every partition handle is released
//!
//! Both shutdown calls are idempotent and safe to race with an in-flight
//! queue scan: shutdown waits (bounded) for outstanding [`ScanLease`]s before
//! closing handles.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use localtasks::store::Store;
//!
//! let store = Store::open(&config.store)?;
//! store.save(None, b"key", b"value");
//! let value = store.find(None, b"key");
//! store.close();
//! ```

pub mod error;
pub mod iter;
pub mod keyspace;
pub mod namespace;
pub mod state;

pub use error::{Result, StoreError};
pub use iter::PartitionIter;
pub use keyspace::{MAX_KEY_LEN, ScanLease, Store, check_key};
pub use namespace::{DEFAULT_PARTITION, JOBS_PARTITION, Namespace};
pub use state::{StateCell, WorkerState};
