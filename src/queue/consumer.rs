use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::descriptor::{Action, DescriptorDecoder, JobDescriptor};
use crate::config::WorkerConfig;
use crate::crypto::{FileProcessor, ProcessError};
use crate::observability::Metrics;
use crate::store::{JOBS_PARTITION, Store};

const THREAD_NAME: &str = "queue-consumer";

/// Result of handling one queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    Failed,
    Invalid,
    NotFound,
}

impl JobOutcome {
    /// Numeric result code used in logs
    pub fn code(self) -> i32 {
        match self {
            JobOutcome::Succeeded => 1,
            JobOutcome::Failed | JobOutcome::Invalid => -1,
            JobOutcome::NotFound => -10,
        }
    }
}

/// Background worker draining the jobs partition
///
/// Every entry is removed after one attempt, whatever the outcome, so a job
/// runs at most once.
pub struct QueueConsumer {
    store: Arc<Store>,
    decoder: Arc<dyn DescriptorDecoder>,
    processor: Arc<dyn FileProcessor>,
    metrics: Arc<Metrics>,
    poll_interval: Duration,
}

impl QueueConsumer {
    pub fn new(
        store: Arc<Store>,
        decoder: Arc<dyn DescriptorDecoder>,
        processor: Arc<dyn FileProcessor>,
        metrics: Arc<Metrics>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            store,
            decoder,
            processor,
            metrics,
            poll_interval: config.poll_interval(),
        }
    }

    /// Run the consumer loop on its own named thread
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || self.run())
    }

    /// Scan until the store asks background work to stop
    pub fn run(&self) {
        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Queue consumer started"
        );

        while !self.store.can_stop() {
            let seen = self.store.job_generation();
            if self.run_once() == 0 {
                self.store.wait_for_jobs(seen, self.poll_interval);
            }
        }

        info!(
            jobs = self.metrics.snapshot().total(),
            "Queue consumer stopped"
        );
    }

    /// One pass over the jobs partition; returns the number of entries removed
    ///
    /// An entry whose removal fails is skipped for the rest of the pass and
    /// not counted, so the caller falls back to the idle wait instead of
    /// spinning on it.
    pub fn run_once(&self) -> usize {
        let Some(_lease) = self.store.begin_scan() else {
            return 0;
        };
        let Some(entries) = self.store.new_iterator(Some(JOBS_PARTITION), true) else {
            return 0;
        };
        debug!(namespace = %entries.namespace(), "Scanning job queue");

        let mut removed = 0;
        for entry in entries {
            let (key, value) = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    error!(error = %e, "Error reading job queue");
                    break;
                }
            };

            let outcome = self.process_job(&key, &value);
            self.metrics.record(outcome);

            if self.store.delete(Some(JOBS_PARTITION), &key) {
                removed += 1;
            } else {
                warn!(
                    job = %String::from_utf8_lossy(&key),
                    "Could not remove processed job"
                );
            }

            if self.store.can_stop() {
                debug!("Stop requested, leaving queue scan");
                break;
            }
        }

        if removed > 0 {
            if let Err(e) = self.store.persist() {
                debug!(error = %e, "Could not flush consumed jobs");
            }
        }
        removed
    }

    fn process_job(&self, key: &[u8], raw: &[u8]) -> JobOutcome {
        let job_key = String::from_utf8_lossy(key);

        let fields = match self.decoder.decode(raw) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(job = %job_key, error = %e, "Could not decode job descriptor");
                return JobOutcome::Invalid;
            }
        };
        let job = match JobDescriptor::from_fields(&fields) {
            Ok(job) => job,
            Err(e) => {
                warn!(job = %job_key, error = %e, "Invalid job descriptor");
                return JobOutcome::Invalid;
            }
        };

        let outcome = self.dispatch(&job_key, &job);
        info!(
            job = %job_key,
            action = %job.action,
            input = %job.input.display(),
            outcome = ?outcome,
            code = outcome.code(),
            "Job finished"
        );
        outcome
    }

    fn dispatch(&self, job_key: &str, job: &JobDescriptor) -> JobOutcome {
        let result = match &job.action {
            Action::Encrypt | Action::Decrypt => {
                let Some(output) = job.output.as_deref() else {
                    warn!(job = job_key, action = %job.action, "Job has no output path");
                    return JobOutcome::Invalid;
                };
                if job.action == Action::Encrypt {
                    self.processor.encrypt(&job.input, output)
                } else {
                    self.processor.decrypt(&job.input, output)
                }
            }
            Action::Checksum => self.processor.checksum(&job.input).map(|digest| {
                info!(
                    job = job_key,
                    input = %job.input.display(),
                    sha256 = %digest,
                    "Computed checksum"
                );
            }),
            Action::Unrecognized(name) => {
                warn!(job = job_key, action = %name, "Unrecognized job action");
                return JobOutcome::Invalid;
            }
        };

        match result {
            Ok(()) => JobOutcome::Succeeded,
            Err(ProcessError::FileNotFound(path)) => {
                warn!(job = job_key, path = %path.display(), "Job file not found");
                JobOutcome::NotFound
            }
            Err(e) => {
                error!(job = job_key, error = %e, "Job failed");
                JobOutcome::Failed
            }
        }
    }
}
