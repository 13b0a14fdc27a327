//! File processing engine used by the queue worker
//!
//! The worker only talks to the [`FileProcessor`] trait; the production
//! implementation is [`KeyFileProcessor`], which encrypts with AES-256-GCM
//! using a key read from disk and checksums with SHA-256.

mod key_file;

pub use key_file::{KeyFileProcessor, NONCE_LEN};

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secret key unavailable: {0}")]
    SecretKey(String),

    #[error("crypto operation failed: {0}")]
    Crypto(String),
}

impl ProcessError {
    /// Map an I/O error on `path`, singling out a missing file
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            ProcessError::FileNotFound(path.to_path_buf())
        } else {
            ProcessError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;

/// Encrypt / decrypt / checksum capability consumed by the queue worker
pub trait FileProcessor: Send + Sync {
    /// Encrypt `input` into `output`
    fn encrypt(&self, input: &Path, output: &Path) -> Result<()>;

    /// Decrypt `input` (as written by [`FileProcessor::encrypt`]) into `output`
    fn decrypt(&self, input: &Path, output: &Path) -> Result<()>;

    /// Digest of the contents of `input`
    fn checksum(&self, input: &Path) -> Result<String>;
}
