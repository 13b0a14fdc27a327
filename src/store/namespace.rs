//! Partition layout of the keyspace
//!
//! - `default`: general key-value records written by the control surface
//! - `cryptojobs`: job descriptors consumed by the queue worker
//!
//! The set is fixed at compile time; names outside it resolve to nothing.
use std::fmt;

/// Name of the default partition
pub const DEFAULT_PARTITION: &str = "default";

/// Name of the job queue partition
pub const JOBS_PARTITION: &str = "cryptojobs";

/// A declared partition of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Default,
    Jobs,
}

impl Namespace {
    /// Every declared partition, in the order they are opened
    pub const ALL: [Namespace; 2] = [Namespace::Default, Namespace::Jobs];

    /// Resolve a caller-supplied namespace name
    ///
    /// An absent or empty name maps to [`Namespace::Default`]. Anything else
    /// must match a partition name exactly; unknown names yield `None`.
    pub fn resolve(name: Option<&str>) -> Option<Self> {
        match name {
            None | Some("") => Some(Namespace::Default),
            Some(DEFAULT_PARTITION) => Some(Namespace::Default),
            Some(JOBS_PARTITION) => Some(Namespace::Jobs),
            Some(_) => None,
        }
    }

    pub fn partition_name(&self) -> &'static str {
        match self {
            Namespace::Default => DEFAULT_PARTITION,
            Namespace::Jobs => JOBS_PARTITION,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.partition_name())
    }
}
