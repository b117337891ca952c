use crate::normalizer::Normalizer;
use crate::{DocId, Document, Result, SearchError};
use std::collections::{BTreeSet, HashMap};

/// term -> ids of the documents containing it, ascending.
pub type Postings = HashMap<String, BTreeSet<DocId>>;
/// id -> the full record, used to hydrate results.
pub type DocMap = HashMap<DocId, Document>;
/// id -> (term -> occurrences in that document).
pub type TermFrequencies = HashMap<DocId, HashMap<String, u32>>;

/// Mutable staging area for a single build pass.
///
/// Append-only: documents are registered and indexed once, then
/// [`IndexBuilder::finish`] hands back a read-only [`InvertedIndex`].
pub struct IndexBuilder {
    normalizer: Normalizer,
    postings: Postings,
    docmap: DocMap,
    term_frequencies: TermFrequencies,
}

impl IndexBuilder {
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            postings: Postings::new(),
            docmap: DocMap::new(),
            term_frequencies: TermFrequencies::new(),
        }
    }

    /// Register `document` and index its title and description.
    pub fn insert(&mut self, document: Document) -> Result<()> {
        let id = document.id;
        let text = document.indexable_text();
        self.register(document)?;
        self.add_document(id, &text)
    }

    /// Index `text` under an already registered `id`.
    ///
    /// Not idempotent: calling it twice for one id doubles that id's counts.
    pub fn add_document(&mut self, id: DocId, text: &str) -> Result<()> {
        if !self.docmap.contains_key(&id) {
            return Err(SearchError::UnknownDocument { id });
        }
        let counts = self.term_frequencies.entry(id).or_default();
        for term in self.normalizer.normalize(text) {
            self.postings.entry(term.clone()).or_default().insert(id);
            *counts.entry(term).or_insert(0) += 1;
        }
        Ok(())
    }

    pub fn finish(self) -> InvertedIndex {
        InvertedIndex {
            normalizer: self.normalizer,
            postings: self.postings,
            docmap: self.docmap,
            term_frequencies: self.term_frequencies,
        }
    }

    fn register(&mut self, document: Document) -> Result<()> {
        let position = self.docmap.len();
        if self.docmap.contains_key(&document.id) {
            return Err(SearchError::StructuralDocument {
                position,
                reason: format!("duplicate id {}", document.id),
            });
        }
        // Documents whose text normalizes to nothing still get a row.
        self.term_frequencies.entry(document.id).or_default();
        self.docmap.insert(document.id, document);
        Ok(())
    }
}

/// Postings, docmap and term-frequency table, built and persisted as one unit.
#[derive(Debug, Clone)]
pub struct InvertedIndex {
    normalizer: Normalizer,
    postings: Postings,
    docmap: DocMap,
    term_frequencies: TermFrequencies,
}

impl InvertedIndex {
    /// Build an index from the whole corpus in one pass. Fails fast on the first bad record.
    pub fn build<I>(normalizer: Normalizer, documents: I) -> Result<Self>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut builder = IndexBuilder::new(normalizer);
        let mut order = Vec::new();
        for document in documents {
            order.push(document.id);
            builder.register(document)?;
        }
        for id in order {
            let text = builder.docmap[&id].indexable_text();
            builder.add_document(id, &text)?;
        }
        let index = builder.finish();
        tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "built inverted index");
        Ok(index)
    }

    pub(crate) fn from_parts(
        normalizer: Normalizer,
        postings: Postings,
        docmap: DocMap,
        term_frequencies: TermFrequencies,
    ) -> Self {
        Self { normalizer, postings, docmap, term_frequencies }
    }

    pub(crate) fn postings_map(&self) -> &Postings {
        &self.postings
    }

    pub(crate) fn docmap(&self) -> &DocMap {
        &self.docmap
    }

    pub(crate) fn term_frequencies(&self) -> &TermFrequencies {
        &self.term_frequencies
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn num_docs(&self) -> usize {
        self.docmap.len()
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn document(&self, id: DocId) -> Option<&Document> {
        self.docmap.get(&id)
    }

    /// Postings for an already normalized term.
    pub fn postings(&self, term: &str) -> Option<&BTreeSet<DocId>> {
        self.postings.get(term)
    }

    /// Union of the postings of every term `text` normalizes to, ascending by id.
    pub fn documents_for(&self, text: &str) -> Vec<DocId> {
        let mut ids = BTreeSet::new();
        for term in self.normalizer.normalize(text) {
            if let Some(postings) = self.postings.get(&term) {
                ids.extend(postings.iter().copied());
            }
        }
        ids.into_iter().collect()
    }

    /// Occurrences of `term` in document `id`; 0 when either is unknown.
    pub fn term_frequency(&self, id: DocId, term: &str) -> Result<u32> {
        let terms = self.normalizer.normalize(term);
        let [term_key] = terms.as_slice() else {
            return Err(SearchError::InvalidQuery { input: term.to_string(), terms: terms.len() });
        };
        Ok(self
            .term_frequencies
            .get(&id)
            .and_then(|counts| counts.get(term_key))
            .copied()
            .unwrap_or(0))
    }

    /// Check that the three structures agree with each other.
    pub(crate) fn check_consistency(&self) -> std::result::Result<(), String> {
        for (id, document) in &self.docmap {
            if document.id != *id {
                return Err(format!("docmap key {id} holds document {}", document.id));
            }
            if !self.term_frequencies.contains_key(id) {
                return Err(format!("document {id} has no term-frequency row"));
            }
        }
        for (id, counts) in &self.term_frequencies {
            if !self.docmap.contains_key(id) {
                return Err(format!("term-frequency row for unknown document {id}"));
            }
            for (term, count) in counts {
                let listed = self.postings.get(term).is_some_and(|ids| ids.contains(id));
                if *count == 0 || !listed {
                    return Err(format!("term {term:?} in document {id} disagrees with postings"));
                }
            }
        }
        for (term, ids) in &self.postings {
            for id in ids {
                let counted = self
                    .term_frequencies
                    .get(id)
                    .is_some_and(|counts| counts.contains_key(term));
                if !counted {
                    return Err(format!("postings for {term:?} list document {id} without a count"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stopwords;

    fn normalizer() -> Normalizer {
        Normalizer::new(Stopwords::from_words(["a", "the"]))
    }

    fn corpus() -> Vec<Document> {
        vec![
            Document::new(7, "The Racer", "cars racing cars"),
            Document::new(3, "Toy Story", "a cowboy doll and a space ranger"),
        ]
    }

    #[test]
    fn build_tracks_postings_and_counts() {
        let index = InvertedIndex::build(normalizer(), corpus()).unwrap();
        assert_eq!(index.num_docs(), 2);
        assert_eq!(index.documents_for("car"), vec![7]);
        assert_eq!(index.term_frequency(7, "cars").unwrap(), 2);
        assert_eq!(index.term_frequency(7, "racing").unwrap(), 1);
        assert_eq!(index.term_frequency(3, "car").unwrap(), 0);
        assert_eq!(index.term_frequency(99, "car").unwrap(), 0);
        assert!(index.check_consistency().is_ok());
    }

    #[test]
    fn documents_for_unions_and_sorts() {
        let index = InvertedIndex::build(normalizer(), corpus()).unwrap();
        assert_eq!(index.documents_for("cowboy cars"), vec![3, 7]);
        assert!(index.documents_for("the").is_empty());
        assert!(index.documents_for("unheard").is_empty());
    }

    #[test]
    fn term_frequency_requires_exactly_one_term() {
        let index = InvertedIndex::build(normalizer(), corpus()).unwrap();
        let err = index.term_frequency(7, "cars racing").unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery { terms: 2, .. }));
        let err = index.term_frequency(7, "the").unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery { terms: 0, .. }));
    }

    #[test]
    fn duplicate_ids_fail_the_build() {
        let mut docs = corpus();
        docs.push(Document::new(7, "Again", "duplicate"));
        let err = InvertedIndex::build(normalizer(), docs).unwrap_err();
        assert!(matches!(err, SearchError::StructuralDocument { position: 2, .. }));
    }

    #[test]
    fn add_document_rejects_unregistered_ids_and_double_counts() {
        let mut builder = IndexBuilder::new(normalizer());
        assert!(matches!(
            builder.add_document(1, "cars"),
            Err(SearchError::UnknownDocument { id: 1 })
        ));
        builder.insert(Document::new(1, "Cars", "")).unwrap();
        builder.add_document(1, "cars").unwrap();
        let index = builder.finish();
        assert_eq!(index.term_frequency(1, "car").unwrap(), 2);
    }

    #[test]
    fn empty_documents_keep_a_frequency_row() {
        let index = InvertedIndex::build(normalizer(), vec![Document::new(1, "The", "a")]).unwrap();
        assert_eq!(index.num_terms(), 0);
        assert!(index.term_frequencies().contains_key(&1));
        assert!(index.check_consistency().is_ok());
    }
}
