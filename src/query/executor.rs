//! Query executor for one generation
//!
//! Resolves each clause's term matches through the generation's trie, scores
//! the postings and reduces the clause list left to right. Intermediate
//! results are kept sorted by document id so every boolean step is a linear
//! merge.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::models::DocumentScore;
use crate::query::scoring::ScoringScheme;
use crate::query::types::{Occur, QueryClause, QueryTree, TermMatch};
use crate::segment::GenerationReader;
use crate::trie::Word;
use crate::Result;

/// Executes query trees against a single generation
pub struct QueryExecutor<'a> {
    generation: &'a GenerationReader,
    scoring: &'a dyn ScoringScheme,
    total_docs: u64,
}

impl<'a> QueryExecutor<'a> {
    /// # Arguments
    ///
    /// * `generation` - Generation to search
    /// * `scoring` - Relevance model
    /// * `total_docs` - Corpus-wide document count used for idf
    pub fn new(generation: &'a GenerationReader, scoring: &'a dyn ScoringScheme, total_docs: u64) -> Self {
        Self {
            generation,
            scoring,
            total_docs,
        }
    }

    /// Reduce the whole tree. The result is sorted by document id.
    pub fn execute(&self, tree: &QueryTree) -> Result<Vec<DocumentScore>> {
        let mut clauses = tree.clauses.iter();
        let mut accumulated = match clauses.next() {
            Some(first) => self.resolve_clause(first)?,
            None => return Ok(Vec::new()),
        };

        for clause in clauses {
            let next = self.resolve_clause(clause)?;
            accumulated = match clause.occur {
                Occur::Must => intersect(&accumulated, &next),
                Occur::Should => union(&accumulated, &next),
                Occur::MustNot => exclude(&accumulated, &next),
            };
        }
        Ok(accumulated)
    }

    /// Words of the field matched by one term
    fn resolve_words(&self, field: &str, terms: &[TermMatch]) -> Result<Vec<Word>> {
        let mut trie = match self.generation.trie(field)? {
            Some(trie) => trie,
            None => return Ok(Vec::new()),
        };

        let mut words = Vec::new();
        for term in terms {
            match term {
                TermMatch::Exact(token) => words.extend(trie.is_word(token)?),
                TermMatch::Prefix(prefix) => words.extend(trie.starts_with(prefix)?),
                TermMatch::Fuzzy { value, max_edits } => {
                    words.extend(trie.near(value, *max_edits)?)
                }
                TermMatch::Range { lower, upper } => {
                    words.extend(trie.within_range(lower, upper)?)
                }
            }
        }

        // Several term matches of one clause may find the same word
        words.sort_by(|a, b| a.value.cmp(&b.value));
        words.dedup_by(|a, b| a.value == b.value);
        Ok(words)
    }

    /// Score every document matched by any term of the clause
    pub fn resolve_clause(&self, clause: &QueryClause) -> Result<Vec<DocumentScore>> {
        let words = self.resolve_words(&clause.field, &clause.terms)?;
        let postings = self.generation.read_postings(&words)?;

        let mut scores: BTreeMap<u32, DocumentScore> = BTreeMap::new();
        for list in &postings {
            let docs_with_term = list.len() as u64;
            for posting in list {
                let score = self
                    .scoring
                    .score(posting.term_frequency, docs_with_term, self.total_docs);
                let hit = DocumentScore::new(posting.document_id, score, posting.term_frequency);
                scores
                    .entry(posting.document_id)
                    .and_modify(|s| s.merge(&hit))
                    .or_insert(hit);
            }
        }

        debug!(
            "Clause {} in {}: {} words, {} documents",
            clause,
            self.generation.id(),
            words.len(),
            scores.len()
        );
        Ok(scores.into_values().collect())
    }
}

/// Documents present on both sides, scores summed
pub fn intersect(left: &[DocumentScore], right: &[DocumentScore]) -> Vec<DocumentScore> {
    let mut out = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].document_id.cmp(&right[j].document_id) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                let mut hit = left[i].clone();
                hit.merge(&right[j]);
                out.push(hit);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Documents present on either side, scores summed where both match
pub fn union(left: &[DocumentScore], right: &[DocumentScore]) -> Vec<DocumentScore> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].document_id.cmp(&right[j].document_id) {
            Ordering::Less => {
                out.push(left[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                out.push(right[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                let mut hit = left[i].clone();
                hit.merge(&right[j]);
                out.push(hit);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&left[i..]);
    out.extend_from_slice(&right[j..]);
    out
}

/// Documents of `left` that `right` does not contain
pub fn exclude(left: &[DocumentScore], right: &[DocumentScore]) -> Vec<DocumentScore> {
    let mut out = Vec::with_capacity(left.len());
    let mut j = 0;
    for hit in left {
        while j < right.len() && right[j].document_id < hit.document_id {
            j += 1;
        }
        if j < right.len() && right[j].document_id == hit.document_id {
            continue;
        }
        out.push(hit.clone());
    }
    out
}

/// Order by descending score, then ascending document id
pub fn rank(hits: &mut [DocumentScore]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });
}
