//! Error type for the threat-intel crate. Grounded on
//! `sentinel-core/src/error.rs`'s `#[from]`-heavy `thiserror` enum.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntelError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cloud request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("cloud responded with an invalid payload: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, IntelError>;
