//! Snapshot persistence.
//!
//! A snapshot directory holds `meta.json` (schema version, counts, build
//! time, stopwords) plus three bincode artifacts: `postings.bin`,
//! `docmap.bin` and `term_frequencies.bin`. Each artifact is wrapped in an
//! [`Envelope`] carrying a magic tag and the schema version.

use crate::index::{DocMap, Postings, TermFrequencies};
use crate::{InvertedIndex, Normalizer, Result, SearchError, Stopwords};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_INDEX_DIR: &str = "cache";

const POSTINGS_MAGIC: [u8; 4] = *b"KSPO";
const DOCMAP_MAGIC: [u8; 4] = *b"KSDM";
const TERM_FREQUENCIES_MAGIC: [u8; 4] = *b"KSTF";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub stopwords: Stopwords,
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    magic: [u8; 4],
    version: u32,
    payload: T,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    pub fn docmap(&self) -> PathBuf { self.root.join("docmap.bin") }
    pub fn term_frequencies(&self) -> PathBuf { self.root.join("term_frequencies.bin") }
}

impl Default for IndexPaths {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_DIR)
    }
}

/// Write the whole index to `paths.root`, creating the directory if needed.
///
/// Not atomic: a failure part way through leaves an unusable snapshot that
/// only a fresh build and save repairs.
pub fn save(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    let num_docs = manifest_count(paths, "documents", index.num_docs())?;
    let num_terms = manifest_count(paths, "terms", index.num_terms())?;
    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .map_err(|e| SearchError::snapshot_write(paths.meta(), e.to_string()))?;

    create_dir_all(&paths.root).map_err(|e| SearchError::io(&paths.root, e))?;

    save_artifact(&paths.postings(), POSTINGS_MAGIC, index.postings_map())?;
    save_artifact(&paths.docmap(), DOCMAP_MAGIC, index.docmap())?;
    save_artifact(&paths.term_frequencies(), TERM_FREQUENCIES_MAGIC, index.term_frequencies())?;

    let meta = MetaFile {
        version: SCHEMA_VERSION,
        num_docs,
        num_terms,
        created_at,
        stopwords: index.normalizer().stopwords().clone(),
    };
    save_meta(paths, &meta)?;

    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, num_terms = meta.num_terms, "saved index");
    Ok(())
}

/// Read a snapshot back. Missing pieces are `IndexNotFound`, unreadable ones `CorruptIndex`.
pub fn load(paths: &IndexPaths) -> Result<InvertedIndex> {
    let meta = load_meta(paths)?;
    if meta.version != SCHEMA_VERSION {
        tracing::warn!(found = meta.version, expected = SCHEMA_VERSION, "rejecting snapshot");
        return Err(SearchError::corrupt(
            paths.meta(),
            format!("schema version {} (expected {SCHEMA_VERSION})", meta.version),
        ));
    }

    let postings: Postings = load_artifact(paths, &paths.postings(), POSTINGS_MAGIC)?;
    let docmap: DocMap = load_artifact(paths, &paths.docmap(), DOCMAP_MAGIC)?;
    let term_frequencies: TermFrequencies =
        load_artifact(paths, &paths.term_frequencies(), TERM_FREQUENCIES_MAGIC)?;

    let index = InvertedIndex::from_parts(Normalizer::new(meta.stopwords), postings, docmap, term_frequencies);
    index.check_consistency().map_err(|reason| {
        tracing::warn!(%reason, "rejecting snapshot");
        SearchError::corrupt(&paths.root, reason)
    })?;
    if index.num_docs() != meta.num_docs as usize || index.num_terms() != meta.num_terms as usize {
        return Err(SearchError::corrupt(paths.meta(), "counts do not match the artifacts"));
    }

    tracing::info!(root = %paths.root.display(), num_docs = index.num_docs(), num_terms = index.num_terms(), "loaded index");
    Ok(index)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    let path = paths.meta();
    let json = serde_json::to_string_pretty(meta)
        .map_err(|e| SearchError::snapshot_write(&path, e.to_string()))?;
    fs::write(&path, json).map_err(|e| SearchError::io(&path, e))?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    let buf = read_existing(paths, &path)?;
    serde_json::from_slice(&buf).map_err(|e| SearchError::corrupt(&path, e.to_string()))
}

/// Manifest counts are `u32`; refuse to write a count that would not fit.
fn manifest_count(paths: &IndexPaths, what: &str, count: usize) -> Result<u32> {
    u32::try_from(count)
        .map_err(|_| SearchError::snapshot_write(paths.meta(), format!("{count} {what} exceed the manifest limit")))
}

fn save_artifact<T: Serialize>(path: &Path, magic: [u8; 4], payload: &T) -> Result<()> {
    let envelope = Envelope { magic, version: SCHEMA_VERSION, payload };
    let bytes = bincode::serialize(&envelope)
        .map_err(|e| SearchError::snapshot_write(path, e.to_string()))?;
    fs::write(path, &bytes).map_err(|e| SearchError::io(path, e))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote artifact");
    Ok(())
}

fn load_artifact<T: DeserializeOwned>(paths: &IndexPaths, path: &Path, magic: [u8; 4]) -> Result<T> {
    let buf = read_existing(paths, path)?;
    let envelope: Envelope<T> =
        bincode::deserialize(&buf).map_err(|e| SearchError::corrupt(path, e.to_string()))?;
    if envelope.magic != magic {
        return Err(SearchError::corrupt(path, "unexpected artifact tag"));
    }
    if envelope.version != SCHEMA_VERSION {
        return Err(SearchError::corrupt(
            path,
            format!("schema version {} (expected {SCHEMA_VERSION})", envelope.version),
        ));
    }
    tracing::debug!(path = %path.display(), bytes = buf.len(), "read artifact");
    Ok(envelope.payload)
}

fn read_existing(paths: &IndexPaths, path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SearchError::IndexNotFound { path: paths.root.clone() },
        _ => SearchError::io(path, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use tempfile::tempdir;

    fn tiny_index() -> InvertedIndex {
        let docs = vec![
            Document::new(1, "Brave", "A princess named Merida"),
            Document::new(2, "Cars", "Racing cars"),
        ];
        InvertedIndex::build(Normalizer::new(Stopwords::from_words(["a", "named"])), docs).unwrap()
    }

    #[test]
    fn load_from_empty_dir_is_not_found() {
        let dir = tempdir().unwrap();
        let err = load(&IndexPaths::new(dir.path().join("missing"))).unwrap_err();
        assert!(err.is_index_not_found());
    }

    #[test]
    fn missing_artifact_is_not_found() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save(&paths, &tiny_index()).unwrap();
        fs::remove_file(paths.docmap()).unwrap();
        assert!(load(&paths).unwrap_err().is_index_not_found());
    }

    #[test]
    fn garbage_artifact_is_corrupt() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save(&paths, &tiny_index()).unwrap();
        fs::write(paths.postings(), b"not bincode").unwrap();
        assert!(matches!(load(&paths), Err(SearchError::CorruptIndex { .. })));
    }

    #[test]
    fn swapped_artifacts_are_corrupt() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save(&paths, &tiny_index()).unwrap();
        fs::copy(paths.docmap(), paths.term_frequencies()).unwrap();
        assert!(matches!(load(&paths), Err(SearchError::CorruptIndex { .. })));
    }

    #[test]
    fn future_schema_version_is_corrupt() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save(&paths, &tiny_index()).unwrap();
        let mut meta = load_meta(&paths).unwrap();
        meta.version = SCHEMA_VERSION + 1;
        save_meta(&paths, &meta).unwrap();
        assert!(matches!(load(&paths), Err(SearchError::CorruptIndex { .. })));
    }

    #[test]
    fn unparsable_manifest_is_corrupt() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save(&paths, &tiny_index()).unwrap();
        fs::write(paths.meta(), "{ not json").unwrap();
        match load(&paths) {
            Err(SearchError::CorruptIndex { path, .. }) => assert_eq!(path, paths.meta()),
            other => panic!("expected CorruptIndex, got {other:?}"),
        }
    }

    #[test]
    fn manifest_counts_disagreeing_with_artifacts_are_corrupt() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save(&paths, &tiny_index()).unwrap();

        let mut meta = load_meta(&paths).unwrap();
        meta.num_docs += 1;
        save_meta(&paths, &meta).unwrap();
        assert!(matches!(load(&paths), Err(SearchError::CorruptIndex { .. })));

        meta.num_docs -= 1;
        meta.num_terms = 0;
        save_meta(&paths, &meta).unwrap();
        assert!(matches!(load(&paths), Err(SearchError::CorruptIndex { .. })));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_counts_are_refused() {
        let paths = IndexPaths::new("unused");
        assert_eq!(manifest_count(&paths, "documents", 7).unwrap(), 7);
        let err = manifest_count(&paths, "documents", u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, SearchError::SnapshotWrite { .. }));
    }

    #[test]
    fn manifest_records_counts_and_stopwords() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path().join("nested/cache"));
        save(&paths, &tiny_index()).unwrap();
        let meta = load_meta(&paths).unwrap();
        assert_eq!(meta.version, SCHEMA_VERSION);
        assert_eq!(meta.num_docs, 2);
        assert!(meta.stopwords.contains("named"));
        let loaded = load(&paths).unwrap();
        assert_eq!(loaded.normalizer(), tiny_index().normalizer());
    }
}
