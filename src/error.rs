use std::path::PathBuf;
use thiserror::Error;

/// Every way a search run can fail. None of these are recoverable.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to allocate {what} ({bytes} bytes)")]
    Allocation { what: &'static str, bytes: usize },

    #[error("Digit source exhausted at offset {offset}")]
    StreamExhausted { offset: u64 },

    #[error("Malformed digit data in {}: {reason}", .path.display())]
    MalformedSource { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Allocate a zero-filled vector, reporting failure instead of aborting.
pub fn try_zeroed<T: Clone + Default>(len: usize, what: &'static str) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| SearchError::Allocation {
        what,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    v.resize(len, T::default());
    Ok(v)
}
