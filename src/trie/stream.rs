//! Sequential access to a node-record stream
//!
//! Readers cannot follow pointers in the flat format, so traversal works on a
//! stream with a single-record replay slot: a caller that consumed a record it
//! is not ready for can `rewind` it once, and `skip` moves past a whole
//! subtree without decoding it.

use std::io::{self, BufReader, Read, Seek, SeekFrom};

use super::types::{TrieNode, RECORD_SIZE};
use crate::error::TriedexError;
use crate::Result;

/// Stream of trie node records with one record of lookahead
pub struct NodeStream<R> {
    inner: BufReader<R>,
    /// Record handed back by `rewind`, returned by the next `step`
    replay: Option<TrieNode>,
    /// Set once the current segment's sentinel (or end of file) was read
    at_segment_end: bool,
}

impl<R: Read + Seek> NodeStream<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            replay: None,
            at_segment_end: false,
        }
    }

    /// Position the stream at a segment start
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.replay = None;
        self.at_segment_end = false;
        Ok(())
    }

    /// Read the next record of the current segment.
    ///
    /// Returns `None` at the segment sentinel and keeps returning `None`
    /// until the stream is re-positioned.
    pub fn step(&mut self) -> Result<Option<TrieNode>> {
        if let Some(node) = self.replay.take() {
            return Ok(Some(node));
        }
        if self.at_segment_end {
            return Ok(None);
        }

        let mut buf = [0u8; RECORD_SIZE];
        match read_record(&mut self.inner, &mut buf)? {
            RecordRead::Full => {}
            RecordRead::EndOfFile => {
                self.at_segment_end = true;
                return Ok(None);
            }
        }

        let node = TrieNode::decode(&buf)?;
        if node.is_none() {
            self.at_segment_end = true;
        }
        Ok(node)
    }

    /// Hand a consumed record back so the next `step` returns it again
    pub fn rewind(&mut self, node: TrieNode) {
        debug_assert!(self.replay.is_none(), "replay slot holds one record");
        self.replay = Some(node);
    }

    /// Look at the next record without consuming it
    pub fn peek(&mut self) -> Result<Option<&TrieNode>> {
        if self.replay.is_none() {
            if let Some(node) = self.step()? {
                self.rewind(node);
            }
        }
        Ok(self.replay.as_ref())
    }

    /// Advance past `count` records without decoding them.
    ///
    /// Small subtrees usually end inside the read buffer, which a relative
    /// seek keeps.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        let mut remaining = count;
        if remaining > 0 && self.replay.take().is_some() {
            remaining -= 1;
        }
        if remaining > 0 {
            let bytes = remaining
                .checked_mul(RECORD_SIZE as u64)
                .and_then(|b| i64::try_from(b).ok())
                .ok_or_else(|| TriedexError::corrupt(format!("skip of {} records", count)))?;
            self.inner.seek_relative(bytes)?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

enum RecordRead {
    Full,
    EndOfFile,
}

/// Fill `buf` with one record. A clean end of file is reported as such; a
/// partial record is corruption.
fn read_record<R: Read>(input: &mut R, buf: &mut [u8; RECORD_SIZE]) -> Result<RecordRead> {
    let mut filled = 0;
    while filled < RECORD_SIZE {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    match filled {
        0 => Ok(RecordRead::EndOfFile),
        RECORD_SIZE => Ok(RecordRead::Full),
        n => {
            tracing::warn!("Trie stream ends inside a record ({} of {} bytes)", n, RECORD_SIZE);
            Err(TriedexError::corrupt(format!(
                "unexpected end of stream after {} of {} record bytes",
                n, RECORD_SIZE
            )))
        }
    }
}
