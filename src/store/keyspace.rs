use std::sync::Arc;
use std::time::{Duration, Instant};

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::StoreConfig;

use super::error::{Result, StoreError};
use super::iter::PartitionIter;
use super::namespace::Namespace;
use super::state::{StateCell, WorkerState};

struct Engine {
    keyspace: Keyspace,
    default: PartitionHandle,
    jobs: PartitionHandle,
}

impl Engine {
    fn partition(&self, namespace: Namespace) -> &PartitionHandle {
        match namespace {
            Namespace::Default => &self.default,
            Namespace::Jobs => &self.jobs,
        }
    }

    /// Flush the journal, then release partition handles before the keyspace
    fn close(self) -> Result<()> {
        let Engine {
            keyspace,
            default,
            jobs,
        } = self;
        let persisted = keyspace.persist(PersistMode::SyncAll);
        drop(default);
        drop(jobs);
        drop(keyspace);
        persisted?;
        Ok(())
    }
}

/// Fjall-backed key-value store with a job queue partition
///
/// Data operations (`save`, `find`, `delete`, iterator creation) share one
/// coarse lock around the engine. Shutdown (`prep_for_shutdown`, `close`)
/// serializes on its own lock so that waiting for an in-flight queue scan
/// never blocks the scan's own deletes.
pub struct Store {
    engine: Mutex<Option<Engine>>,
    state: Arc<StateCell>,
    shutdown_lock: Mutex<()>,
    active_scans: Mutex<usize>,
    scans_idle: Condvar,
    job_generation: Mutex<u64>,
    jobs_ready: Condvar,
    shutdown_wait: Duration,
}

/// Marks a queue scan as in flight until dropped
///
/// Shutdown waits for every outstanding lease before releasing partition
/// handles.
pub struct ScanLease<'a> {
    store: &'a Store,
}

impl Drop for ScanLease<'_> {
    fn drop(&mut self) {
        let mut active = self.store.active_scans.lock();
        *active = active.saturating_sub(1);
        if *active == 0 {
            self.store.scans_idle.notify_all();
        }
    }
}

/// Longest key the engine accepts
pub const MAX_KEY_LEN: usize = u16::MAX as usize;

/// Reject keys the engine cannot store; it panics on them instead of erroring
pub fn check_key(key: &[u8]) -> Result<()> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(StoreError::InvalidKey(key.len()));
    }
    Ok(())
}

fn resolve(namespace: Option<&str>) -> Result<Namespace> {
    Namespace::resolve(namespace)
        .ok_or_else(|| StoreError::UnknownPartition(namespace.unwrap_or_default().to_string()))
}

impl Store {
    /// Open or create the keyspace and declare every partition
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = config.path.as_path();
        info!("Opening store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let default = keyspace.open_partition(
            Namespace::Default.partition_name(),
            PartitionCreateOptions::default(),
        )?;
        let jobs = keyspace.open_partition(
            Namespace::Jobs.partition_name(),
            PartitionCreateOptions::default(),
        )?;

        info!("Store opened successfully");
        Ok(Self {
            engine: Mutex::new(Some(Engine {
                keyspace,
                default,
                jobs,
            })),
            state: Arc::new(StateCell::new()),
            shutdown_lock: Mutex::new(()),
            active_scans: Mutex::new(0),
            scans_idle: Condvar::new(),
            job_generation: Mutex::new(0),
            jobs_ready: Condvar::new(),
            shutdown_wait: config.shutdown_wait(),
        })
    }

    fn with_partition<T>(
        &self,
        namespace: Namespace,
        op: impl FnOnce(&PartitionHandle) -> Result<T>,
    ) -> Result<T> {
        let engine = self.engine.lock();
        let engine = engine.as_ref().ok_or(StoreError::Closed)?;
        op(engine.partition(namespace))
    }

    /// Upsert a record
    pub fn put(&self, namespace: Option<&str>, key: &[u8], value: &[u8]) -> Result<()> {
        check_key(key)?;
        let ns = resolve(namespace)?;
        self.with_partition(ns, |partition| Ok(partition.insert(key, value)?))?;
        if ns == Namespace::Jobs {
            self.signal_jobs();
        }
        Ok(())
    }

    /// Point lookup
    pub fn get(&self, namespace: Option<&str>, key: &[u8]) -> Result<Option<Vec<u8>>> {
        check_key(key)?;
        let ns = resolve(namespace)?;
        self.with_partition(ns, |partition| {
            Ok(partition.get(key)?.map(|value| value.to_vec()))
        })
    }

    /// Remove a record; removing an absent key succeeds
    pub fn remove(&self, namespace: Option<&str>, key: &[u8]) -> Result<()> {
        check_key(key)?;
        let ns = resolve(namespace)?;
        self.with_partition(ns, |partition| Ok(partition.remove(key)?))
    }

    /// Upsert a record, logging and returning `false` on any failure
    pub fn save(&self, namespace: Option<&str>, key: &[u8], value: &[u8]) -> bool {
        debug!(
            namespace = namespace.unwrap_or_default(),
            key = %String::from_utf8_lossy(key),
            size = value.len(),
            "Saving entry"
        );
        match self.put(namespace, key, value) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    namespace = namespace.unwrap_or_default(),
                    error = %e,
                    "Error saving entry"
                );
                false
            }
        }
    }

    /// Look up a record; missing keys and failures both yield `None`
    pub fn find(&self, namespace: Option<&str>, key: &[u8]) -> Option<Vec<u8>> {
        match self.get(namespace, key) {
            Ok(value) => {
                debug!(
                    namespace = namespace.unwrap_or_default(),
                    key = %String::from_utf8_lossy(key),
                    found = value.is_some(),
                    "Finding entry"
                );
                value
            }
            Err(e) => {
                error!(
                    namespace = namespace.unwrap_or_default(),
                    key = %String::from_utf8_lossy(key),
                    error = %e,
                    "Error retrieving entry"
                );
                None
            }
        }
    }

    /// Delete a record, logging and returning `false` on failure
    pub fn delete(&self, namespace: Option<&str>, key: &[u8]) -> bool {
        debug!(
            namespace = namespace.unwrap_or_default(),
            key = %String::from_utf8_lossy(key),
            "Deleting entry"
        );
        match self.remove(namespace, key) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    namespace = namespace.unwrap_or_default(),
                    error = %e,
                    "Error deleting entry"
                );
                false
            }
        }
    }

    /// Forward iterator over a partition, starting at its first key
    ///
    /// See [`PartitionIter`] for tailing semantics. Returns `None` for an
    /// unknown partition or a closed store.
    pub fn new_iterator(&self, namespace: Option<&str>, tailing: bool) -> Option<PartitionIter> {
        let ns = match resolve(namespace) {
            Ok(ns) => ns,
            Err(e) => {
                warn!(error = %e, "Cannot create iterator");
                return None;
            }
        };

        let engine = self.engine.lock();
        match engine.as_ref() {
            Some(engine) => Some(PartitionIter::new(
                ns,
                engine.partition(ns),
                tailing,
                self.state.clone(),
            )),
            None => {
                warn!(namespace = %ns, "Cannot create iterator on a closed store");
                None
            }
        }
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        let engine = self.engine.lock();
        let engine = engine.as_ref().ok_or(StoreError::Closed)?;
        engine.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    pub fn state(&self) -> WorkerState {
        self.state.load()
    }

    /// True once shutdown has been requested
    pub fn can_stop(&self) -> bool {
        self.state.load() >= WorkerState::Stopping
    }

    /// Register an in-flight queue scan
    ///
    /// Returns `None` once shutdown has been requested.
    pub fn begin_scan(&self) -> Option<ScanLease<'_>> {
        let mut active = self.active_scans.lock();
        if self.state.load() != WorkerState::Running {
            return None;
        }
        *active += 1;
        Some(ScanLease { store: self })
    }

    /// Counter bumped by every write to the jobs partition and by shutdown
    pub fn job_generation(&self) -> u64 {
        *self.job_generation.lock()
    }

    /// Block until the job generation moves past `seen`, shutdown is
    /// requested, or `timeout` elapses
    pub fn wait_for_jobs(&self, seen: u64, timeout: Duration) {
        let mut generation = self.job_generation.lock();
        if *generation != seen || self.can_stop() {
            return;
        }
        let _ = self.jobs_ready.wait_for(&mut generation, timeout);
    }

    fn signal_jobs(&self) {
        let mut generation = self.job_generation.lock();
        *generation = generation.wrapping_add(1);
        self.jobs_ready.notify_all();
    }

    fn wait_for_scans(&self) -> bool {
        let deadline = Instant::now() + self.shutdown_wait;
        let mut active = self.active_scans.lock();
        while *active > 0 {
            if self.scans_idle.wait_until(&mut active, deadline).timed_out() {
                return *active == 0;
            }
        }
        true
    }

    /// Request shutdown and wait for the queue worker to leave its scan
    ///
    /// Idempotent: only the first call has any effect.
    pub fn prep_for_shutdown(&self) {
        let _guard = self.shutdown_lock.lock();
        self.stop_background_work();
    }

    fn stop_background_work(&self) {
        if !self
            .state
            .transition(WorkerState::Running, WorkerState::Stopping)
        {
            info!("Already prepped for shutdown");
            return;
        }

        info!("Cancelling background work");
        self.signal_jobs();

        if self.wait_for_scans() {
            info!("Background work cancelled");
        } else {
            warn!(
                wait_ms = self.shutdown_wait.as_millis() as u64,
                "Queue scan still in flight after shutdown wait"
            );
        }
    }

    /// Flush and close the store
    ///
    /// Returns `true` if this call closed the store, `false` if it was
    /// already closed.
    pub fn close(&self) -> bool {
        let _guard = self.shutdown_lock.lock();

        if self.state.load() == WorkerState::Stopped {
            info!("Store already closed");
            return false;
        }
        if self.state.load() == WorkerState::Running {
            self.stop_background_work();
        }

        info!("Closing store");
        let engine = self.engine.lock().take();
        self.state
            .transition(WorkerState::Stopping, WorkerState::Stopped);

        if let Some(engine) = engine {
            if let Err(e) = engine.close() {
                error!(error = %e, "Error flushing store during close");
            }
        }

        info!("Store closed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::namespace::JOBS_PARTITION;
    use std::thread;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> StoreConfig {
        StoreConfig {
            path: temp_dir.path().join("store"),
            shutdown_wait_ms: 5_000,
        }
    }

    fn create_test_store() -> (Store, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open(&test_config(&temp_dir)).unwrap();
        (store, temp_dir)
    }

    fn collect_keys(iter: PartitionIter) -> Vec<Vec<u8>> {
        iter.map(|item| item.unwrap().0).collect()
    }

    #[test]
    fn test_open_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open(&test_config(&temp_dir));
        assert!(store.is_ok());
        assert_eq!(store.unwrap().state(), WorkerState::Running);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            path: temp_dir.path().join("nested").join("dir").join("store"),
            shutdown_wait_ms: 100,
        };
        assert!(Store::open(&config).is_ok());
    }

    #[test]
    fn test_save_and_find() {
        let (store, _temp) = create_test_store();

        assert!(store.save(None, b"greeting", b"hello"));
        assert_eq!(store.find(None, b"greeting"), Some(b"hello".to_vec()));

        // Upsert overwrites
        assert!(store.save(None, b"greeting", b"bye"));
        assert_eq!(store.find(None, b"greeting"), Some(b"bye".to_vec()));
    }

    #[test]
    fn test_empty_namespace_is_default() {
        let (store, _temp) = create_test_store();

        assert!(store.save(Some(""), b"k", b"v"));
        assert_eq!(store.find(None, b"k"), Some(b"v".to_vec()));
        assert_eq!(store.find(Some("default"), b"k"), Some(b"v".to_vec()));
    }

    #[test]
    fn test_find_missing_key() {
        let (store, _temp) = create_test_store();
        assert_eq!(store.find(None, b"missing"), None);
        assert!(store.get(None, b"missing").unwrap().is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (store, _temp) = create_test_store();

        assert!(store.save(None, b"k", b"v"));
        assert!(store.delete(None, b"k"));
        assert_eq!(store.find(None, b"k"), None);

        // Deleting an absent key still succeeds
        assert!(store.delete(None, b"k"));
        assert!(store.delete(None, b"never-existed"));
    }

    #[test]
    fn test_namespace_isolation() {
        let (store, _temp) = create_test_store();

        assert!(store.save(Some("default"), b"shared", b"one"));
        assert!(store.save(Some(JOBS_PARTITION), b"shared", b"two"));

        assert_eq!(store.find(Some("default"), b"shared"), Some(b"one".to_vec()));
        assert_eq!(store.find(Some(JOBS_PARTITION), b"shared"), Some(b"two".to_vec()));

        assert!(store.delete(Some(JOBS_PARTITION), b"shared"));
        assert_eq!(store.find(Some("default"), b"shared"), Some(b"one".to_vec()));
    }

    #[test]
    fn test_unknown_namespace() {
        let (store, _temp) = create_test_store();

        assert!(!store.save(Some("bogus"), b"k", b"v"));
        assert_eq!(store.find(Some("bogus"), b"k"), None);
        assert!(!store.delete(Some("bogus"), b"k"));
        assert!(store.new_iterator(Some("bogus"), true).is_none());

        let err = store.put(Some("bogus"), b"k", b"v").unwrap_err();
        assert!(matches!(err, StoreError::UnknownPartition(name) if name == "bogus"));
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let (store, _temp) = create_test_store();

        assert!(!store.save(None, b"", b"v"));
        assert_eq!(store.find(None, b""), None);
        assert!(!store.delete(None, b""));
        assert!(matches!(
            store.put(None, b"", b"v"),
            Err(StoreError::InvalidKey(0))
        ));

        // The engine stays usable afterwards
        assert!(store.save(None, b"ok", b"v"));
        assert!(store.delete(None, b"ok"));
        assert!(store.close());
    }

    #[test]
    fn test_oversized_key_is_rejected() {
        let (store, _temp) = create_test_store();
        let too_long = vec![b'k'; MAX_KEY_LEN + 1];

        assert!(!store.save(Some(JOBS_PARTITION), &too_long, b"v"));
        assert_eq!(store.find(Some(JOBS_PARTITION), &too_long), None);
        assert!(!store.delete(Some(JOBS_PARTITION), &too_long));
        assert!(matches!(
            store.get(None, &too_long),
            Err(StoreError::InvalidKey(65536))
        ));

        let longest = vec![b'k'; MAX_KEY_LEN];
        assert!(store.save(None, &longest, b"v"));
        assert_eq!(store.find(None, &longest), Some(b"v".to_vec()));
        assert!(store.close());
    }

    #[test]
    fn test_persistence_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        {
            let store = Store::open(&config).unwrap();
            assert!(store.save(None, b"durable", b"yes"));
            assert!(store.save(Some(JOBS_PARTITION), b"job1", b"{}"));
            assert!(store.close());
        }

        let store = Store::open(&config).unwrap();
        assert_eq!(store.find(None, b"durable"), Some(b"yes".to_vec()));
        assert_eq!(store.find(Some(JOBS_PARTITION), b"job1"), Some(b"{}".to_vec()));
    }

    #[test]
    fn test_iterator_visits_keys_in_order() {
        let (store, _temp) = create_test_store();
        store.save(None, b"b", b"2");
        store.save(None, b"a", b"1");
        store.save(None, b"c", b"3");

        let iter = store.new_iterator(None, true).unwrap();
        assert_eq!(collect_keys(iter), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_tailing_iterator_sees_later_inserts() {
        let (store, _temp) = create_test_store();
        store.save(Some(JOBS_PARTITION), b"job1", b"x");

        let mut iter = store.new_iterator(Some(JOBS_PARTITION), true).unwrap();
        assert!(iter.is_tailing());
        assert_eq!(iter.next().unwrap().unwrap().0, b"job1".to_vec());

        store.save(Some(JOBS_PARTITION), b"job2", b"y");
        assert_eq!(iter.next().unwrap().unwrap().0, b"job2".to_vec());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_snapshot_iterator_ignores_later_inserts() {
        let (store, _temp) = create_test_store();
        store.save(None, b"a", b"1");

        let iter = store.new_iterator(None, false).unwrap();
        assert!(!iter.is_tailing());
        store.save(None, b"b", b"2");

        assert_eq!(collect_keys(iter), vec![b"a".to_vec()]);
    }

    #[test]
    fn test_snapshot_iterator_yields_values() {
        let (store, _temp) = create_test_store();
        store.save(Some(JOBS_PARTITION), b"job1", b"one");
        store.save(Some(JOBS_PARTITION), b"job2", b"two");

        let iter = store.new_iterator(Some(JOBS_PARTITION), false).unwrap();
        assert_eq!(iter.namespace(), Namespace::Jobs);

        let entries: Vec<_> = iter.map(|item| item.unwrap()).collect();
        assert_eq!(
            entries,
            vec![
                (b"job1".to_vec(), b"one".to_vec()),
                (b"job2".to_vec(), b"two".to_vec())
            ]
        );
    }

    #[test]
    fn test_iterator_tolerates_deleting_current_entry() {
        let (store, _temp) = create_test_store();
        for key in [b"k1", b"k2", b"k3"] {
            store.save(Some(JOBS_PARTITION), key, b"v");
        }

        let mut seen = Vec::new();
        let iter = store.new_iterator(Some(JOBS_PARTITION), true).unwrap();
        for item in iter {
            let (key, _) = item.unwrap();
            assert!(store.delete(Some(JOBS_PARTITION), &key));
            seen.push(key);
        }

        assert_eq!(seen.len(), 3);
        let remaining = store.new_iterator(Some(JOBS_PARTITION), true).unwrap();
        assert_eq!(remaining.count(), 0);
    }

    #[test]
    fn test_seek_to_first_rewinds() {
        let (store, _temp) = create_test_store();
        store.save(None, b"a", b"1");

        let mut iter = store.new_iterator(None, true).unwrap();
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());

        iter.seek_to_first();
        assert_eq!(iter.next().unwrap().unwrap().0, b"a".to_vec());
    }

    #[test]
    fn test_close_is_idempotent() {
        let (store, _temp) = create_test_store();
        store.save(None, b"k", b"v");

        assert!(store.close());
        assert_eq!(store.state(), WorkerState::Stopped);

        assert!(!store.close());
        assert_eq!(store.state(), WorkerState::Stopped);
    }

    #[test]
    fn test_operations_after_close_fail_softly() {
        let (store, _temp) = create_test_store();
        store.save(None, b"k", b"v");
        store.close();

        assert!(!store.save(None, b"k", b"v2"));
        assert_eq!(store.find(None, b"k"), None);
        assert!(!store.delete(None, b"k"));
        assert!(store.new_iterator(None, true).is_none());
        assert!(matches!(store.get(None, b"k"), Err(StoreError::Closed)));
        assert!(matches!(store.persist(), Err(StoreError::Closed)));
    }

    #[test]
    fn test_iterator_ends_when_store_closes() {
        let (store, _temp) = create_test_store();
        store.save(None, b"a", b"1");
        store.save(None, b"b", b"2");

        let mut iter = store.new_iterator(None, true).unwrap();
        assert!(iter.next().is_some());

        store.close();
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_prep_for_shutdown_is_idempotent() {
        let (store, _temp) = create_test_store();

        store.prep_for_shutdown();
        assert_eq!(store.state(), WorkerState::Stopping);
        assert!(store.can_stop());

        store.prep_for_shutdown();
        assert_eq!(store.state(), WorkerState::Stopping);

        // Engine is still usable between prep and close
        assert!(store.save(None, b"k", b"v"));
        assert!(store.begin_scan().is_none());

        assert!(store.close());
        assert_eq!(store.state(), WorkerState::Stopped);
    }

    #[test]
    fn test_close_waits_for_scan_lease() {
        let (store, _temp) = create_test_store();
        let store = Arc::new(store);

        let lease = store.begin_scan().unwrap();

        let closer = {
            let store = store.clone();
            thread::spawn(move || store.close())
        };

        thread::sleep(Duration::from_millis(100));
        assert_eq!(store.state(), WorkerState::Stopping);
        // The scan can still clean up its entry while shutdown waits
        assert!(store.delete(Some(JOBS_PARTITION), b"job1"));

        drop(lease);
        assert!(closer.join().unwrap());
        assert_eq!(store.state(), WorkerState::Stopped);
    }

    #[test]
    fn test_close_gives_up_after_shutdown_wait() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            path: temp_dir.path().join("store"),
            shutdown_wait_ms: 50,
        };
        let store = Store::open(&config).unwrap();

        let lease = store.begin_scan().unwrap();
        let started = Instant::now();
        assert!(store.close());
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(store.state(), WorkerState::Stopped);
        drop(lease);
    }

    #[test]
    fn test_wait_for_jobs_wakes_on_enqueue() {
        let (store, _temp) = create_test_store();
        let store = Arc::new(store);
        let seen = store.job_generation();

        let writer = {
            let store = store.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                store.save(Some(JOBS_PARTITION), b"job1", b"{}");
            })
        };

        let started = Instant::now();
        store.wait_for_jobs(seen, Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_ne!(store.job_generation(), seen);
        writer.join().unwrap();
    }

    #[test]
    fn test_wait_for_jobs_returns_immediately_when_stale() {
        let (store, _temp) = create_test_store();
        let seen = store.job_generation();
        store.save(Some(JOBS_PARTITION), b"job1", b"{}");

        let started = Instant::now();
        store.wait_for_jobs(seen, Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_default_partition_writes_do_not_wake_queue() {
        let (store, _temp) = create_test_store();
        let seen = store.job_generation();
        store.save(None, b"k", b"v");
        assert_eq!(store.job_generation(), seen);
    }

    #[test]
    fn test_concurrent_save_and_find() {
        let (store, _temp) = create_test_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        let key = format!("w{worker}-k{i}");
                        let value = format!("value-{worker}-{i}");
                        assert!(store.save(None, key.as_bytes(), value.as_bytes()));
                        assert_eq!(store.find(None, key.as_bytes()), Some(value.into_bytes()));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        for worker in 0..8 {
            for i in 0..50 {
                let key = format!("w{worker}-k{i}");
                let value = format!("value-{worker}-{i}");
                assert_eq!(store.find(None, key.as_bytes()), Some(value.into_bytes()));
            }
        }
    }
}
