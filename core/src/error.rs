use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the indexing and retrieval core.
#[derive(Debug, Error)]
pub enum SearchError {
    /// A single-term lookup got input that normalizes to zero or several terms.
    #[error("expected exactly one term in {input:?}, normalization produced {terms}")]
    InvalidQuery { input: String, terms: usize },

    /// No snapshot has been saved at the location yet.
    #[error("no index found at {}", path.display())]
    IndexNotFound { path: PathBuf },

    #[error("corrupt index at {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    /// A corpus record is missing a required field or repeats an id.
    #[error("document #{position}: {reason}")]
    StructuralDocument { position: usize, reason: String },

    /// Text was added for an id that was never registered in the docmap.
    #[error("document id {id} is not registered")]
    UnknownDocument { id: crate::DocId },

    /// The index could not be encoded into a snapshot.
    #[error("cannot write snapshot at {}: {reason}", path.display())]
    SnapshotWrite { path: PathBuf, reason: String },

    #[error("corpus file {} is not valid JSON", path.display())]
    MalformedCorpus {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("i/o error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SearchError {
    /// True for the recoverable "build first" condition.
    pub fn is_index_not_found(&self) -> bool {
        matches!(self, SearchError::IndexNotFound { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SearchError::Io { path: path.into(), source }
    }

    pub(crate) fn snapshot_write(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SearchError::SnapshotWrite { path: path.into(), reason: reason.into() }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SearchError::CorruptIndex { path: path.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
