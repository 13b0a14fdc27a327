use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use aes_gcm::Aes256Gcm;
use aes_gcm::Nonce;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{FileProcessor, ProcessError, Result};
use crate::config::CryptoConfig;

/// Length of the nonce prefixed to every encrypted file
pub const NONCE_LEN: usize = 12;

const KEY_LEN: usize = 32;

/// AES-256-GCM file processor keyed from a file on disk
///
/// The key file holds either 32 raw bytes or 64 hex characters (surrounding
/// whitespace ignored). It is re-read on every call, so it may be created or
/// rotated while the process runs.
///
/// Encrypted layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
#[derive(Debug, Clone)]
pub struct KeyFileProcessor {
    key_path: PathBuf,
}

impl KeyFileProcessor {
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
        }
    }

    pub fn from_config(config: &CryptoConfig) -> Self {
        Self::new(config.secret_key_path.clone())
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    fn load_cipher(&self) -> Result<Aes256Gcm> {
        let raw = fs::read(&self.key_path).map_err(|e| {
            ProcessError::SecretKey(format!("{}: {}", self.key_path.display(), e))
        })?;
        let key = parse_key(&raw)?;
        Aes256Gcm::new_from_slice(&key)
            .map_err(|_| ProcessError::SecretKey(format!("key must be {KEY_LEN} bytes")))
    }
}

fn parse_key(raw: &[u8]) -> Result<Vec<u8>> {
    if raw.len() == KEY_LEN {
        return Ok(raw.to_vec());
    }

    let text = std::str::from_utf8(raw).map_err(|_| {
        ProcessError::SecretKey("key file is neither raw bytes nor hex".to_string())
    })?;
    let key = hex::decode(text.trim())
        .map_err(|e| ProcessError::SecretKey(format!("invalid hex key: {e}")))?;

    if key.len() != KEY_LEN {
        return Err(ProcessError::SecretKey(format!(
            "key must be {KEY_LEN} bytes, got {}",
            key.len()
        )));
    }
    Ok(key)
}

impl FileProcessor for KeyFileProcessor {
    fn encrypt(&self, input: &Path, output: &Path) -> Result<()> {
        let plaintext = fs::read(input).map_err(|e| ProcessError::io(input, e))?;
        let cipher = self.load_cipher()?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|e| ProcessError::Crypto(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(nonce.as_slice());
        sealed.extend_from_slice(&ciphertext);
        fs::write(output, &sealed).map_err(|e| ProcessError::io(output, e))?;

        debug!(
            input = %input.display(),
            output = %output.display(),
            size = plaintext.len(),
            "Encrypted file"
        );
        Ok(())
    }

    fn decrypt(&self, input: &Path, output: &Path) -> Result<()> {
        let sealed = fs::read(input).map_err(|e| ProcessError::io(input, e))?;
        let cipher = self.load_cipher()?;

        if sealed.len() < NONCE_LEN {
            return Err(ProcessError::Crypto(format!(
                "{} is too short to be an encrypted file",
                input.display()
            )));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| ProcessError::Crypto(e.to_string()))?;

        fs::write(output, &plaintext).map_err(|e| ProcessError::io(output, e))?;

        debug!(
            input = %input.display(),
            output = %output.display(),
            size = plaintext.len(),
            "Decrypted file"
        );
        Ok(())
    }

    fn checksum(&self, input: &Path) -> Result<String> {
        let mut file = File::open(input).map_err(|e| ProcessError::io(input, e))?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher).map_err(|e| ProcessError::io(input, e))?;
        Ok(hex::encode(hasher.finalize()))
    }
}
