//! Trie serializer
//!
//! Writes each bucket's trie as one segment of fixed-width records closed by
//! a sentinel, and records every segment's starting offset in a side index
//! so readers can jump straight to a bucket.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use xxhash_rust::xxh3::xxh3_64;

use super::builder::LcrsTrie;
use super::types::{TrieNode, RECORD_SIZE};
use crate::error::TriedexError;
use crate::Result;

/// Pick the segment a token belongs to from a hash of its first
/// `prefix_len` characters.
pub fn bucket_of(token: &str, prefix_len: usize, bucket_count: usize) -> usize {
    let end = token
        .char_indices()
        .nth(prefix_len)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    (xxh3_64(token[..end].as_bytes()) % bucket_count as u64) as usize
}

/// Stable file id for a field name
pub fn field_file_id(field: &str) -> String {
    format!("{:016x}", xxh3_64(field.as_bytes()))
}

/// Byte offsets of segment starts inside a node-record stream
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SegmentIndex {
    offsets: Vec<u64>,
}

impl SegmentIndex {
    pub fn new(offsets: Vec<u64>) -> Self {
        Self { offsets }
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Start offset of a segment
    pub fn offset(&self, segment: usize) -> Option<u64> {
        self.offsets.get(segment).copied()
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        for offset in &self.offsets {
            out.write_all(&offset.to_le_bytes())?;
        }
        out.flush()
    }

    /// Read a side index; its length determines the segment count
    pub fn read_from<R: Read>(mut input: R) -> Result<Self> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        if data.len() % 8 != 0 {
            return Err(TriedexError::corrupt(format!(
                "segment index length {} is not a multiple of 8",
                data.len()
            )));
        }

        let offsets: Vec<u64> = data
            .chunks_exact(8)
            .map(|chunk| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(chunk);
                u64::from_le_bytes(bytes)
            })
            .collect();

        if offsets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TriedexError::corrupt("segment offsets are not increasing"));
        }
        if offsets.iter().any(|o| o % RECORD_SIZE as u64 != 0) {
            return Err(TriedexError::corrupt(
                "segment offset is not aligned to a record boundary",
            ));
        }

        Ok(Self { offsets })
    }
}

/// Serializes tries into a segmented node-record stream
pub struct TrieWriter<W: Write> {
    out: W,
    position: u64,
    offsets: Vec<u64>,
}

impl<W: Write> TrieWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            position: 0,
            offsets: Vec::new(),
        }
    }

    /// Append one trie as the next segment
    pub fn write_segment(&mut self, trie: &LcrsTrie) -> Result<()> {
        self.offsets.push(self.position);
        for node in trie.preorder() {
            if node.end_of_word && node.address.is_none() {
                return Err(TriedexError::Internal(format!(
                    "word ending in '{}' at depth {} was never given postings",
                    node.value, node.depth
                )));
            }
            self.write_record(&node.encode())?;
        }
        self.write_record(&TrieNode::segment_end_record())
    }

    fn write_record(&mut self, record: &[u8; RECORD_SIZE]) -> Result<()> {
        self.out.write_all(record)?;
        self.position += RECORD_SIZE as u64;
        Ok(())
    }

    /// Flush the stream and hand back the writer plus the side index
    pub fn finish(mut self) -> Result<(W, SegmentIndex)> {
        self.out.flush()?;
        Ok((self.out, SegmentIndex::new(self.offsets)))
    }
}

/// Write one field's bucket tries to `<trie_path>` and its side index to
/// `<index_path>`.
pub fn write_field_files(trie_path: &Path, index_path: &Path, tries: &[LcrsTrie]) -> Result<()> {
    let mut writer = TrieWriter::new(BufWriter::new(File::create(trie_path)?));
    for trie in tries {
        writer.write_segment(trie)?;
    }
    let (out, index) = writer.finish()?;
    out.into_inner().map_err(|e| e.into_error())?.sync_all()?;

    let index_file = File::create(index_path)?;
    index.write_to(BufWriter::new(&index_file))?;
    index_file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::types::BlockAddress;

    fn trie_of(words: &[&str]) -> LcrsTrie {
        let mut trie = LcrsTrie::new();
        for (i, word) in words.iter().enumerate() {
            let node = trie.insert(word).unwrap();
            trie.set_address(node, BlockAddress::new(i as u64 * 16, 16));
        }
        trie
    }

    #[test]
    fn test_bucket_of_is_stable() {
        let a = bucket_of("rain", 2, 16);
        assert_eq!(a, bucket_of("rain", 2, 16));
        // Tokens sharing the hashed prefix share a bucket
        assert_eq!(bucket_of("rain", 2, 16), bucket_of("rattle", 2, 16));
        assert_eq!(bucket_of("r", 2, 16), bucket_of("r", 5, 16));
        assert!(bucket_of("x", 1, 3) < 3);
        // Multi-byte prefixes are cut on character boundaries
        assert_eq!(bucket_of("éclair", 1, 16), bucket_of("école", 1, 16));
    }

    #[test]
    fn test_field_file_id() {
        assert_eq!(field_file_id("title"), field_file_id("title"));
        assert_ne!(field_file_id("title"), field_file_id("body"));
        assert_eq!(field_file_id("title").len(), 16);
    }

    #[test]
    fn test_segments_and_offsets() {
        let mut writer = TrieWriter::new(Vec::new());
        writer.write_segment(&trie_of(&["ab", "ac"])).unwrap();
        writer.write_segment(&LcrsTrie::new()).unwrap();
        writer.write_segment(&trie_of(&["z"])).unwrap();
        let (bytes, index) = writer.finish().unwrap();

        // 3 nodes + sentinel, sentinel, 1 node + sentinel
        assert_eq!(bytes.len(), 7 * RECORD_SIZE);
        assert_eq!(
            index.offsets(),
            &[0, 4 * RECORD_SIZE as u64, 5 * RECORD_SIZE as u64]
        );

        let mut sentinel = [0u8; RECORD_SIZE];
        sentinel.copy_from_slice(&bytes[3 * RECORD_SIZE..4 * RECORD_SIZE]);
        assert!(TrieNode::decode(&sentinel).unwrap().is_none());
    }

    #[test]
    fn test_unaddressed_word_is_rejected() {
        let mut trie = LcrsTrie::new();
        trie.insert("orphan");
        let mut writer = TrieWriter::new(Vec::new());
        assert!(matches!(
            writer.write_segment(&trie),
            Err(TriedexError::Internal(_))
        ));
    }

    #[test]
    fn test_segment_index_io() {
        let index = SegmentIndex::new(vec![0, 50, 75]);
        let mut bytes = Vec::new();
        index.write_to(&mut bytes).unwrap();
        assert_eq!(SegmentIndex::read_from(&bytes[..]).unwrap(), index);

        assert!(SegmentIndex::read_from(&bytes[..5]).unwrap_err().is_corruption());

        let unordered = SegmentIndex::new(vec![50, 0]);
        let mut bytes = Vec::new();
        unordered.write_to(&mut bytes).unwrap();
        assert!(SegmentIndex::read_from(&bytes[..]).unwrap_err().is_corruption());
    }
}
