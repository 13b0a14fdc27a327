use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No such partition: {0}")]
    UnknownPartition(String),

    #[error("Invalid key length {0}: keys must be 1 to 65535 bytes")]
    InvalidKey(usize),

    #[error("Store is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, StoreError>;
