//! Loaders for the movie dataset and stopword list.

use crate::{DocId, Document, Result, SearchError, Stopwords};
use serde_json::Value;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Load movie records from a JSON file.
///
/// Accepts either a top-level array or an object with a `movies` array.
/// The first record with a missing or mistyped field fails the whole load.
pub fn load_documents<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SearchError::io(path, e))?;
    let json: Value = serde_json::from_reader(BufReader::new(file))
        .map_err(|source| SearchError::MalformedCorpus { path: path.to_path_buf(), source })?;
    let documents = documents_from_value(json)?;
    tracing::info!(path = %path.display(), count = documents.len(), "loaded corpus");
    Ok(documents)
}

pub fn documents_from_value(json: Value) -> Result<Vec<Document>> {
    let records = match json {
        Value::Array(arr) => arr,
        Value::Object(mut obj) => match obj.remove("movies") {
            Some(Value::Array(arr)) => arr,
            _ => {
                return Err(SearchError::StructuralDocument {
                    position: 0,
                    reason: "expected a `movies` array".into(),
                })
            }
        },
        _ => {
            return Err(SearchError::StructuralDocument {
                position: 0,
                reason: "expected an array of movies".into(),
            })
        }
    };
    records
        .iter()
        .enumerate()
        .map(|(position, record)| document_from_record(position, record))
        .collect()
}

fn document_from_record(position: usize, record: &Value) -> Result<Document> {
    let missing = |field: &str, kind: &str| SearchError::StructuralDocument {
        position,
        reason: format!("field `{field}` is missing or not {kind}"),
    };
    let id = record
        .get("id")
        .and_then(Value::as_u64)
        .and_then(|id| DocId::try_from(id).ok())
        .ok_or_else(|| missing("id", "a non-negative 32-bit integer"))?;
    let title = record.get("title").and_then(Value::as_str).ok_or_else(|| missing("title", "a string"))?;
    let description = record
        .get("description")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("description", "a string"))?;
    Ok(Document::new(id, title, description))
}

/// One stopword per line; blank lines are ignored.
pub fn load_stopwords<P: AsRef<Path>>(path: P) -> Result<Stopwords> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| SearchError::io(path, e))?;
    let stopwords = Stopwords::from_words(text.lines());
    tracing::info!(path = %path.display(), count = stopwords.len(), "loaded stopwords");
    Ok(stopwords)
}
