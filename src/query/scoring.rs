//! Scoring functions for search operations

/// Relevance model used to score a term's postings
pub trait ScoringScheme: Send + Sync {
    /// Score one document for one term
    ///
    /// # Arguments
    /// * `term_frequency` - Occurrences of the term in the document
    /// * `docs_with_term` - Documents whose postings contain the term
    /// * `total_docs` - Documents in the corpus
    fn score(&self, term_frequency: u32, docs_with_term: u64, total_docs: u64) -> f32;
}

/// Classic TF-IDF: `sqrt(tf) * ln(total_docs / docs_with_term)`
#[derive(Clone, Copy, Debug, Default)]
pub struct TfIdf;

impl TfIdf {
    /// Inverse document frequency; zero for an empty corpus or unseen term
    pub fn idf(docs_with_term: u64, total_docs: u64) -> f32 {
        if docs_with_term == 0 || total_docs == 0 {
            return 0.0;
        }
        ((total_docs as f64 / docs_with_term as f64).ln() as f32).max(0.0)
    }
}

impl ScoringScheme for TfIdf {
    fn score(&self, term_frequency: u32, docs_with_term: u64, total_docs: u64) -> f32 {
        (term_frequency as f32).sqrt() * Self::idf(docs_with_term, total_docs)
    }
}
