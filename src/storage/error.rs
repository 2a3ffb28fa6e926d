use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unsupported storage.engine '{engine}'; allowed values: sled, memory")]
    UnsupportedEngine { engine: String },
    #[error("invalid storage.sled.mode '{mode}'; allowed values: low_space, high_throughput")]
    InvalidSledMode { mode: String },
    #[error("cannot resolve storage path because HOME is not set")]
    HomeDirectoryUnavailable,
    #[error("failed to create storage data directory '{}': {source}", path.display())]
    CreateDataDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("backend queue rejected append: {reason}")]
    Rejected { reason: String },
    #[error("sled storage error: {0}")]
    Sled(#[from] sled::Error),
}
