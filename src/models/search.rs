use serde::{Deserialize, Serialize};

use super::document::DocumentId;

/// A document matched by a query, with its relevance score
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentScore {
    pub document_id: DocumentId,
    pub score: f32,
    /// Summed frequency of the matching terms
    pub term_frequency: u32,
}

impl DocumentScore {
    pub fn new(document_id: DocumentId, score: f32, term_frequency: u32) -> Self {
        Self {
            document_id,
            score,
            term_frequency,
        }
    }

    /// Fold another match for the same document into this one
    pub fn merge(&mut self, other: &DocumentScore) {
        self.score += other.score;
        self.term_frequency += other.term_frequency;
    }
}

/// Search response with timing information
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<DocumentScore>,
    /// Matching documents before paging
    pub total_hits: u64,
    pub took_ms: u64,
}

impl SearchResponse {
    pub fn document_ids(&self) -> Vec<DocumentId> {
        self.hits.iter().map(|h| h.document_id).collect()
    }
}
