pub mod document;
pub mod search;

pub use document::{current_timestamp, AnalyzedDocument, Document, DocumentId, Term};
pub use search::{DocumentScore, SearchResponse};
