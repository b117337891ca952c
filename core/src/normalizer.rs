//! Text normalization: the single pipeline shared by indexing and querying.
//!
//! Case folding (NFKC + lowercase), ASCII punctuation deletion, whitespace
//! splitting, stopword removal and Snowball English stemming, in that order.

use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // `[:punct:]` is the 32-character ASCII punctuation class.
    static ref PUNCTUATION: Regex = Regex::new(r"[[:punct:]]").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

const ENGLISH_STOPWORDS: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","can't","cannot","could","couldn't",
    "did","didn't","do","does","doesn't","doing","don't","down","during",
    "each","few","for","from","further",
    "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
    "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
    "let's","me","more","most","mustn't","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
    "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
    "under","until","up","very",
    "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
    "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves",
];

/// Lowercase and strip punctuation. Steps 1 and 2 of the pipeline.
fn fold(text: &str) -> String {
    let lowered = text.nfkc().collect::<String>().to_lowercase();
    PUNCTUATION.replace_all(&lowered, "").into_owned()
}

/// Set of noise words dropped before stemming.
///
/// Entries are folded the same way as document text, so `don't` in a list
/// filters the token `dont`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Stopwords {
    words: BTreeSet<String>,
}

impl Stopwords {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| fold(w.as_ref()).trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Built-in English list, used when no stopword file is supplied.
    pub fn english() -> Self {
        Self::from_words(ENGLISH_STOPWORDS.iter().copied())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.words.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for Stopwords {
    fn from(words: Vec<String>) -> Self {
        Self::from_words(words)
    }
}

impl From<Stopwords> for Vec<String> {
    fn from(stopwords: Stopwords) -> Self {
        stopwords.words.into_iter().collect()
    }
}

/// Turns raw text into index terms. Immutable and cheap to share across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    stopwords: Stopwords,
}

impl Normalizer {
    pub fn new(stopwords: Stopwords) -> Self {
        Self { stopwords }
    }

    pub fn english() -> Self {
        Self::new(Stopwords::english())
    }

    pub fn stopwords(&self) -> &Stopwords {
        &self.stopwords
    }

    /// Normalize `text` into terms, keeping order and duplicates.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        fold(text)
            .split_whitespace()
            .filter(|token| !self.stopwords.contains(token))
            .map(|token| STEMMER.stem(token).into_owned())
            .collect()
    }
}
