pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod segment;
pub mod tokenizer;
pub mod trie;

pub use config::{IndexSettings, TokenizerConfig};
pub use error::{Result, TriedexError};
pub use models::*;
pub use query::{QueryParser, Searcher};
pub use segment::IndexWriter;
pub use tokenizer::Tokenizer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
