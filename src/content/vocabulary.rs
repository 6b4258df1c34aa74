use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only word → definition table for one article.
///
/// Keys are stored trimmed; lookups trim the probe and compare exactly
/// (case-sensitive).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Vocabulary {
    entries: BTreeMap<String, String>,
}

impl Vocabulary {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .filter_map(|(word, definition)| {
                let word = word.as_ref().trim();
                (!word.is_empty()).then(|| (word.to_string(), definition.into()))
            })
            .collect();
        Self { entries }
    }

    pub fn definition(&self, word: &str) -> Option<&str> {
        self.entries.get(word.trim()).map(String::as_str)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.entries.contains_key(word.trim())
    }

    /// Words in sorted order, the order the vocabulary panel lists them.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<BTreeMap<String, String>> for Vocabulary {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self::new(map)
    }
}

impl From<Vocabulary> for BTreeMap<String, String> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.entries
    }
}
