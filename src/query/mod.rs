//! Query parsing and execution
//!
//! A query string is parsed into a `QueryTree` of clauses, each clause is
//! resolved against a generation's trie and postings, and the per-generation
//! results are merged by the `Searcher`.

pub mod executor;
pub mod parser;
pub mod scoring;
pub mod searcher;
pub mod types;

pub use executor::QueryExecutor;
pub use parser::QueryParser;
pub use scoring::{ScoringScheme, TfIdf};
pub use searcher::Searcher;
pub use types::*;
