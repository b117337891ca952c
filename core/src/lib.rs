//! Keyword search over a small movie corpus: normalization, an inverted
//! index with per-document term frequencies, snapshot persistence and
//! set-union retrieval.

use serde::{Deserialize, Serialize};

pub mod corpus;
pub mod error;
pub mod index;
pub mod normalizer;
pub mod persist;
pub mod query;

pub use error::{Result, SearchError};
pub use index::{IndexBuilder, InvertedIndex};
pub use normalizer::{Normalizer, Stopwords};
pub use query::{search, DEFAULT_SEARCH_LIMIT};

pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub description: String,
}

impl Document {
    pub fn new(id: DocId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id, title: title.into(), description: description.into() }
    }

    /// Title and description joined by a single space; this is what gets indexed.
    pub fn indexable_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}
