use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use crate::trie::Word;

/// Unique document identifier
pub type DocumentId = u32;

/// Source document: named text fields
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub fields: BTreeMap<String, String>,
}

impl Document {
    pub fn new(id: DocumentId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.insert(name.into(), text.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// A token within a field. Identifies exactly one postings list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Term {
    pub field: String,
    pub word: Word,
}

impl Term {
    pub fn new(field: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            word: Word::new(token),
        }
    }

    /// Token text
    pub fn token(&self) -> &str {
        &self.word.value
    }
}

// Addresses and distances are lookup results, not part of the term's identity
impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.word.value == other.word.value
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.field.hash(state);
        self.word.value.hash(state);
    }
}

/// Output of document analysis: term frequencies for one document
#[derive(Clone, Debug, Default)]
pub struct AnalyzedDocument {
    pub id: DocumentId,
    pub terms: HashMap<Term, u32>,
}

impl AnalyzedDocument {
    pub fn new(id: DocumentId) -> Self {
        Self {
            id,
            terms: HashMap::new(),
        }
    }

    /// Count one occurrence of `token` in `field`
    pub fn add_token(&mut self, field: &str, token: &str) {
        *self.terms.entry(Term::new(field, token)).or_insert(0) += 1;
    }

    pub fn with_term(mut self, field: &str, token: &str, count: u32) -> Self {
        self.terms.insert(Term::new(field, token), count);
        self
    }

    /// Frequency of a token in a field
    pub fn frequency(&self, field: &str, token: &str) -> u32 {
        self.terms.get(&Term::new(field, token)).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Get current Unix timestamp in seconds
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
