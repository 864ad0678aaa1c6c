//! Term dictionary stored as a serialized left-child/right-sibling trie
//!
//! A trie is built in memory while a generation is written, flattened into
//! fixed-width node records split into hashed segments, and afterwards only
//! ever read back as a sequential stream.

pub mod builder;
pub mod distance;
pub mod reader;
pub mod stream;
pub mod types;
pub mod writer;

pub use builder::LcrsTrie;
pub use distance::{DistanceResolver, Levenshtein};
pub use reader::TrieReader;
pub use stream::NodeStream;
pub use types::{BlockAddress, TrieNode, Word, RECORD_SIZE};
pub use writer::{bucket_of, field_file_id, write_field_files, SegmentIndex, TrieWriter};
