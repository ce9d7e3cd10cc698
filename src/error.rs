//! Error types for module acquisition.
//!
//! Only [`AcquireError`] ever reaches the caller of an acquisition. Block-asset
//! and relocation failures are logged where they happen and never escalate.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Terminal failures of an acquisition. No config is returned when one of these occurs.
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("invalid module request: {0}")]
    Validation(String),

    #[error("module request to {url} returned {status}")]
    Transport { url: String, status: StatusCode },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("module archive extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("failed to read module config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse module config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Failures while decoding a streamed archive onto disk.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Failure to fetch or persist a single block asset.
#[derive(Error, Debug)]
pub enum BlockError {
    #[error("block request to {url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encryption failed: {0}")]
    Encryption(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AcquireError>;
