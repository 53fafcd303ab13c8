use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the fetch, filter, merge, and storage stages.
///
/// None of these are retried; each one aborts the whole update before any
/// output file is replaced.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },
    #[error("unexpected page structure at {url}: {reason}")]
    PageStructure { url: String, reason: String },
    #[error("no valid abbreviations were scraped; refusing to write empty lists")]
    EmptyResult,
    #[error("storage failure at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScrapeError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn page_structure(url: &str, reason: impl Into<String>) -> Self {
        Self::PageStructure {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
