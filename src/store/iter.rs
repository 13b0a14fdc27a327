use std::ops::Bound;
use std::sync::Arc;

use fjall::{PartitionHandle, Snapshot};

use super::error::{Result, StoreError};
use super::namespace::Namespace;
use super::state::{StateCell, WorkerState};

enum Source {
    Live(PartitionHandle),
    Frozen(Snapshot),
}

/// Forward cursor over one partition in key order
///
/// A tailing cursor re-reads the live partition after the last key it
/// returned on every step, so records inserted after creation are visited as
/// long as they sort after the cursor. A non-tailing cursor walks a snapshot
/// taken at creation. Both end once the store reaches
/// [`WorkerState::Stopped`].
pub struct PartitionIter {
    namespace: Namespace,
    source: Source,
    state: Arc<StateCell>,
    cursor: Option<Vec<u8>>,
}

impl PartitionIter {
    pub(crate) fn new(
        namespace: Namespace,
        partition: &PartitionHandle,
        tailing: bool,
        state: Arc<StateCell>,
    ) -> Self {
        let source = if tailing {
            Source::Live(partition.clone())
        } else {
            Source::Frozen(partition.snapshot())
        };

        Self {
            namespace,
            source,
            state,
            cursor: None,
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn is_tailing(&self) -> bool {
        matches!(self.source, Source::Live(_))
    }

    /// Rewind to the first key of the partition
    pub fn seek_to_first(&mut self) {
        self.cursor = None;
    }

    fn remaining(&self) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
        let lower = match &self.cursor {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };
        (lower, Bound::Unbounded)
    }
}

impl Iterator for PartitionIter {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state.load() == WorkerState::Stopped {
            return None;
        }

        let range = self.remaining();
        // Snapshots surface lsm-tree errors, live partitions fjall ones
        let item = match &self.source {
            Source::Live(partition) => partition
                .range(range)
                .next()
                .map(|item| item.map_err(StoreError::from)),
            Source::Frozen(snapshot) => snapshot
                .range(range)
                .next()
                .map(|item| item.map_err(|e| StoreError::from(fjall::Error::from(e)))),
        }?;

        match item {
            Ok((key, value)) => {
                let key = key.to_vec();
                self.cursor = Some(key.clone());
                Some(Ok((key, value.to_vec())))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
