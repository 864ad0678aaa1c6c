//! Core types for the trie term dictionary
//!
//! A serialized trie is a flat stream of fixed-width node records laid out in
//! depth-first preorder: a node's children immediately follow it, and its
//! next sibling follows the last record of its subtree.

use serde::{Deserialize, Serialize};

use crate::error::TriedexError;
use crate::Result;

/// Width of one serialized node record in bytes
pub const RECORD_SIZE: usize = 25;

const FLAG_HAS_SIBLING: u8 = 0b0000_0001;
const FLAG_HAS_CHILD: u8 = 0b0000_0010;
const FLAG_END_OF_WORD: u8 = 0b0000_0100;
const FLAG_SEGMENT_END: u8 = 0b1000_0000;
const KNOWN_FLAGS: u8 = FLAG_HAS_SIBLING | FLAG_HAS_CHILD | FLAG_END_OF_WORD;

/// Position marking a record without a postings address
const NO_ADDRESS: u64 = u64::MAX;

/// Handle to a variable-length record inside an append-only block file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockAddress {
    /// Byte offset of the record
    pub position: u64,
    /// Record length in bytes
    pub length: u32,
}

impl BlockAddress {
    pub fn new(position: u64, length: u32) -> Self {
        Self { position, length }
    }

    /// Offset one past the last byte of the record
    pub fn end(&self) -> u64 {
        self.position + self.length as u64
    }
}

/// A token found in the term dictionary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// Token text
    pub value: String,
    /// Where the token's postings live, if it has any
    pub address: Option<BlockAddress>,
    /// Edit distance to the query token; only set by fuzzy lookups
    pub distance: Option<usize>,
}

impl Word {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            address: None,
            distance: None,
        }
    }

    pub fn with_address(mut self, address: BlockAddress) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_distance(mut self, distance: usize) -> Self {
        self.distance = Some(distance);
        self
    }
}

/// One serialized trie node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrieNode {
    pub value: char,
    pub has_sibling: bool,
    pub has_child: bool,
    pub end_of_word: bool,
    /// Distance from the root; root-level characters sit at depth 0
    pub depth: u32,
    /// This node plus every record of its child subtree
    pub weight: u32,
    pub address: Option<BlockAddress>,
}

impl TrieNode {
    /// Number of records following this one that belong to its subtree
    pub fn descendants(&self) -> u64 {
        self.weight as u64 - 1
    }

    /// Encode into a fixed-width record
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut flags = 0u8;
        if self.has_sibling {
            flags |= FLAG_HAS_SIBLING;
        }
        if self.has_child {
            flags |= FLAG_HAS_CHILD;
        }
        if self.end_of_word {
            flags |= FLAG_END_OF_WORD;
        }

        let (position, length) = match self.address {
            Some(address) => (address.position, address.length),
            None => (NO_ADDRESS, 0),
        };

        let mut buf = [0u8; RECORD_SIZE];
        buf[0..4].copy_from_slice(&(self.value as u32).to_le_bytes());
        buf[4] = flags;
        buf[5..9].copy_from_slice(&self.depth.to_le_bytes());
        buf[9..13].copy_from_slice(&self.weight.to_le_bytes());
        buf[13..21].copy_from_slice(&position.to_le_bytes());
        buf[21..25].copy_from_slice(&length.to_le_bytes());
        buf
    }

    /// The record that closes a segment
    pub fn segment_end_record() -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[4] = FLAG_SEGMENT_END;
        buf
    }

    /// Decode a record. Returns `Ok(None)` for a segment-end sentinel.
    pub fn decode(buf: &[u8; RECORD_SIZE]) -> Result<Option<TrieNode>> {
        let flags = buf[4];
        if flags == FLAG_SEGMENT_END {
            return Ok(None);
        }
        if flags & !KNOWN_FLAGS != 0 {
            return Err(TriedexError::corrupt(format!(
                "unknown node flags {:#010b}",
                flags
            )));
        }

        let code = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let value = char::from_u32(code).ok_or_else(|| {
            TriedexError::corrupt(format!("invalid character code {:#x}", code))
        })?;
        let depth = u32::from_le_bytes([buf[5], buf[6], buf[7], buf[8]]);
        let weight = u32::from_le_bytes([buf[9], buf[10], buf[11], buf[12]]);
        let mut position = [0u8; 8];
        position.copy_from_slice(&buf[13..21]);
        let position = u64::from_le_bytes(position);
        let length = u32::from_le_bytes([buf[21], buf[22], buf[23], buf[24]]);

        let node = TrieNode {
            value,
            has_sibling: flags & FLAG_HAS_SIBLING != 0,
            has_child: flags & FLAG_HAS_CHILD != 0,
            end_of_word: flags & FLAG_END_OF_WORD != 0,
            depth,
            weight,
            address: (position != NO_ADDRESS).then(|| BlockAddress::new(position, length)),
        };
        node.check()?;
        Ok(Some(node))
    }

    fn check(&self) -> Result<()> {
        if self.has_child && self.weight < 2 {
            return Err(TriedexError::corrupt(format!(
                "node '{}' at depth {} has a child but weight {}",
                self.value, self.depth, self.weight
            )));
        }
        if !self.has_child && self.weight != 1 {
            return Err(TriedexError::corrupt(format!(
                "leaf '{}' at depth {} has weight {}",
                self.value, self.depth, self.weight
            )));
        }
        if self.end_of_word && self.address.is_none() {
            return Err(TriedexError::corrupt(format!(
                "word-ending node '{}' at depth {} has no postings address",
                self.value, self.depth
            )));
        }
        Ok(())
    }
}
