//! Generation-based storage for the inverted index
//!
//! # Architecture
//!
//! - `TermBuilder`: In-memory tries and postings for the next generation
//! - `GenerationWriter`: Serializes a builder into immutable files
//! - `GenerationReader`: Trie lookups and postings reads for one generation
//! - `IndexManifest`: Tracks committed generations, saved atomically
//! - `IndexWriter`: Document intake and commits

mod builder;
mod index;
mod manifest;
mod postings;
mod reader;
mod store;
mod types;
mod writer;

pub use builder::*;
pub use index::*;
pub use manifest::*;
pub use postings::*;
pub use reader::*;
pub use store::*;
pub use types::*;
pub use writer::*;
