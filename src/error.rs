use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

/// Quarry's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Quarry's crate-wide error type.
///
/// Structural failures (missing inputs, unusable metadata) get their own
/// variants so the pipeline can abort with a precise message instead of a
/// generic I/O chain. Per-item failures never surface here — they are logged
/// and isolated at the stage that hit them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("input directory does not exist: {0}")]
    MissingInputDir(PathBuf),

    #[error("no audio/subtitle pairs found in {0}")]
    NoPairsFound(PathBuf),

    #[error("metadata index is empty: {0}")]
    EmptyMetadata(PathBuf),

    #[error("metadata index is missing its header row: {0}")]
    MissingHeader(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}
