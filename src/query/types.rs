//! Core types for the query system

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a clause combines with the clauses before it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occur {
    /// Intersect: `+field:value`
    Must,
    /// Union: `field:value`
    Should,
    /// Exclude: `-field:value`
    MustNot,
}

/// One term lookup against a field's trie
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermMatch {
    Exact(String),
    Prefix(String),
    Fuzzy { value: String, max_edits: usize },
    /// Inclusive lexicographic range
    Range { lower: String, upper: String },
}

impl fmt::Display for TermMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermMatch::Exact(value) => write!(f, "{}", value),
            TermMatch::Prefix(value) => write!(f, "{}*", value),
            TermMatch::Fuzzy { value, max_edits } => write!(f, "{}~{}", value, max_edits),
            TermMatch::Range { lower, upper } => write!(f, "[{} TO {}]", lower, upper),
        }
    }
}

/// A parsed `field:value` unit.
///
/// A value that analyzes to several tokens becomes several term matches,
/// whose results are unioned before the clause is combined with the rest of
/// the query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryClause {
    pub occur: Occur,
    pub field: String,
    pub terms: Vec<TermMatch>,
}

impl QueryClause {
    pub fn new(occur: Occur, field: impl Into<String>) -> Self {
        Self {
            occur,
            field: field.into(),
            terms: Vec::new(),
        }
    }

    pub fn with_term(mut self, term: TermMatch) -> Self {
        self.terms.push(term);
        self
    }
}

impl fmt::Display for QueryClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.occur {
            Occur::Must => "+",
            Occur::Should => "",
            Occur::MustNot => "-",
        };
        let terms: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        write!(f, "{}{}:({})", sign, self.field, terms.join(" "))
    }
}

/// Ordered list of clauses, reduced left to right
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTree {
    pub clauses: Vec<QueryClause>,
}

impl QueryTree {
    pub fn new(clauses: Vec<QueryClause>) -> Self {
        Self { clauses }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl fmt::Display for QueryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self.clauses.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", clauses.join(" "))
    }
}
