//src/error.rs

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Everything that can abort a build, a table or one of the filters.
#[derive(Error, Debug)]
pub enum PrismError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `tag_count` weighting was requested but the query carries no `count=` suffix.
    #[error("no count=<number> suffix on query '{query}' (required by tag_count weighting)")]
    WeightExtraction { query: String },

    #[error("could not read distribution artifact {}{}", path.display(), PrismError::detail(msg))]
    StorageRead { path: PathBuf, msg: Option<String> },

    #[error("could not write distribution artifact {}{}", path.display(), PrismError::detail(msg))]
    StorageWrite { path: PathBuf, msg: Option<String> },

    /// A query reappeared after its group of hits was closed; the report is not grouped by query.
    #[error("hits for query '{query}' are not contiguous in {}", path.display())]
    GroupingViolation { query: String, path: PathBuf },

    #[error("failed parsing {context}{}", PrismError::detail(msg))]
    Parse { context: String, msg: Option<String> },

    #[error("{0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, PrismError>;

impl PrismError {
    #[cold]
    pub fn io<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        PrismError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    #[cold]
    pub fn storage_read<P: AsRef<Path>, M: ToString>(path: P, msg: Option<M>) -> Self {
        PrismError::StorageRead {
            path: path.as_ref().to_path_buf(),
            msg: msg.map(|m| m.to_string()),
        }
    }

    #[cold]
    pub fn storage_write<P: AsRef<Path>, M: ToString>(path: P, msg: Option<M>) -> Self {
        PrismError::StorageWrite {
            path: path.as_ref().to_path_buf(),
            msg: msg.map(|m| m.to_string()),
        }
    }

    #[cold]
    pub fn parse<C: Into<String>, M: ToString>(context: C, msg: Option<M>) -> Self {
        PrismError::Parse {
            context: context.into(),
            msg: msg.map(|m| m.to_string()),
        }
    }

    fn detail(msg: &Option<String>) -> String {
        match msg {
            Some(m) => format!(" ({})", m),
            None => String::new(),
        }
    }
}
