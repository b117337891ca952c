//! Set-union retrieval. No scoring: results come back in the order their
//! first matching query term was found, each document once.

use crate::{DocId, Document, InvertedIndex};
use std::collections::HashSet;

pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Up to `limit` documents containing any term of `query`.
///
/// Terms are visited in normalization order and each term's postings in
/// ascending id order. A `limit` of 0 yields nothing.
pub fn search<'a>(index: &'a InvertedIndex, query: &str, limit: usize) -> Vec<&'a Document> {
    let mut seen: HashSet<DocId> = HashSet::new();
    let mut hits: Vec<DocId> = Vec::new();

    'terms: for term in index.normalizer().normalize(query) {
        if hits.len() >= limit {
            break;
        }
        let Some(postings) = index.postings(&term) else { continue };
        for &id in postings {
            if seen.insert(id) {
                hits.push(id);
                if hits.len() >= limit {
                    break 'terms;
                }
            }
        }
    }

    tracing::debug!(query, limit, hits = hits.len(), "search");
    hits.into_iter().filter_map(|id| index.document(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Normalizer, Stopwords};

    fn index() -> InvertedIndex {
        let docs = vec![
            Document::new(1, "Cars", "racing cars on a track"),
            Document::new(2, "Cars 2", "spy cars racing abroad"),
            Document::new(3, "Turbo", "a snail dreams of racing"),
            Document::new(4, "Ratatouille", "a rat cooks in Paris"),
        ];
        InvertedIndex::build(Normalizer::new(Stopwords::from_words(["a", "of", "on", "in"])), docs).unwrap()
    }

    fn ids(docs: &[&Document]) -> Vec<DocId> {
        docs.iter().map(|d| d.id).collect()
    }

    #[test]
    fn follows_term_order_then_postings_order() {
        let index = index();
        assert_eq!(ids(&search(&index, "snail cars", 10)), vec![3, 1, 2]);
        assert_eq!(ids(&search(&index, "rat racing", 10)), vec![4, 1, 2, 3]);
    }

    #[test]
    fn stops_at_limit() {
        let index = index();
        assert_eq!(ids(&search(&index, "racing rat", 2)), vec![1, 2]);
        assert!(search(&index, "racing", 0).is_empty());
    }

    #[test]
    fn repeated_terms_do_not_duplicate_hits() {
        let index = index();
        assert_eq!(ids(&search(&index, "cars car CARS", 10)), vec![1, 2]);
    }

    #[test]
    fn unknown_and_empty_queries_return_nothing() {
        let index = index();
        assert!(search(&index, "zzz", 5).is_empty());
        assert!(search(&index, "a of", 5).is_empty());
        assert!(search(&index, "", 5).is_empty());
    }
}
