//! Job queue consumption
//!
//! The `cryptojobs` partition of the [`Store`](crate::store::Store) doubles
//! as a work queue. Each entry is a JSON job descriptor such as
//!
//! ```json
//! {"action": "encrypt", "input": "/data/report.pdf", "output": "/data/report.pdf.enc"}
//! ```
//!
//! [`QueueConsumer`] drains the partition in key order on a dedicated
//! thread, hands each job to a [`FileProcessor`](crate::crypto::FileProcessor)
//! and removes the entry after a single attempt.

pub mod consumer;
pub mod descriptor;

pub use consumer::{JobOutcome, QueueConsumer};
pub use descriptor::{
    Action, DecodeError, DescriptorDecoder, InvalidJob, JobDescriptor, JsonDecoder,
};
