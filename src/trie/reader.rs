//! Trie Reader
//!
//! Runs depth-first trie algorithms directly over the flat record stream.
//! There are no pointers to follow back up the trie, so every traversal keeps
//! an explicit stack of pending siblings and uses subtree weights to jump
//! over branches it has no interest in.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tracing::debug;

use super::distance::{row_lower_bound, DistanceResolver, Levenshtein};
use super::stream::NodeStream;
use super::types::{TrieNode, Word};
use super::writer::{bucket_of, SegmentIndex};
use crate::error::TriedexError;
use crate::Result;

/// What a traversal does after visiting a node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Visit {
    /// Continue into the node's children
    Descend,
    /// Skip the node's children and move on to its next sibling
    SkipChildren,
    /// End the traversal
    Stop,
}

/// Reads one field's serialized trie
pub struct TrieReader<R> {
    stream: NodeStream<R>,
    index: SegmentIndex,
    prefix_len: usize,
    resolver: Box<dyn DistanceResolver>,
}

impl TrieReader<File> {
    /// Open a field's trie stream and side index
    pub fn open(
        trie_path: impl AsRef<Path>,
        index_path: impl AsRef<Path>,
        prefix_len: usize,
    ) -> Result<Self> {
        let trie_file = File::open(trie_path.as_ref())?;
        let trie_len = trie_file.metadata()?.len();
        let index = SegmentIndex::read_from(BufReader::new(File::open(index_path.as_ref())?))?;

        if let Some(&last) = index.offsets().last() {
            if last >= trie_len {
                return Err(TriedexError::corrupt(format!(
                    "segment offset {} is past the end of {}",
                    last,
                    trie_path.as_ref().display()
                )));
            }
        }

        Self::new(trie_file, index, prefix_len)
    }
}

impl<R: Read + Seek> TrieReader<R> {
    pub fn new(inner: R, index: SegmentIndex, prefix_len: usize) -> Result<Self> {
        if index.is_empty() {
            return Err(TriedexError::corrupt("segment index lists no segments"));
        }
        Ok(Self {
            stream: NodeStream::new(inner),
            index,
            prefix_len,
            resolver: Box::new(Levenshtein),
        })
    }

    /// Replace the edit-distance strategy used by `near`
    pub fn with_resolver(mut self, resolver: Box<dyn DistanceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn segment_count(&self) -> usize {
        self.index.len()
    }

    fn segment_for(&self, token: &str) -> usize {
        bucket_of(token, self.prefix_len, self.index.len())
    }

    fn seek_segment(&mut self, segment: usize) -> Result<()> {
        let offset = self
            .index
            .offset(segment)
            .ok_or_else(|| TriedexError::Internal(format!("no segment {}", segment)))?;
        self.stream.seek(offset)
    }

    /// Look up an exact token in the segment it hashes to
    pub fn is_word(&mut self, token: &str) -> Result<Option<Word>> {
        if token.is_empty() {
            return Ok(None);
        }
        let segment = self.segment_for(token);
        self.is_word_in(segment, token)
    }

    /// Look up an exact token without assuming how it was bucketed
    pub fn is_word_any_segment(&mut self, token: &str) -> Result<Option<Word>> {
        if token.is_empty() {
            return Ok(None);
        }
        for segment in 0..self.segment_count() {
            if let Some(word) = self.is_word_in(segment, token)? {
                return Ok(Some(word));
            }
        }
        Ok(None)
    }

    fn is_word_in(&mut self, segment: usize, token: &str) -> Result<Option<Word>> {
        self.seek_segment(segment)?;
        let chars: Vec<char> = token.chars().collect();
        Ok(self
            .locate(&chars)?
            .filter(|node| node.end_of_word)
            .map(|node| Word {
                value: token.to_string(),
                address: node.address,
                distance: None,
            }))
    }

    /// Every word starting with `prefix`, sorted
    pub fn starts_with(&mut self, prefix: &str) -> Result<Vec<Word>> {
        let chars: Vec<char> = prefix.chars().collect();
        let mut words = Vec::new();

        if chars.len() >= self.prefix_len {
            let segment = self.segment_for(prefix);
            self.starts_with_in(segment, &chars, &mut words)?;
        } else {
            for segment in 0..self.segment_count() {
                self.starts_with_in(segment, &chars, &mut words)?;
            }
        }

        words.sort_by(|a, b| a.value.cmp(&b.value));
        Ok(words)
    }

    fn starts_with_in(&mut self, segment: usize, prefix: &[char], out: &mut Vec<Word>) -> Result<()> {
        self.seek_segment(segment)?;

        let mut collect = |node: &TrieNode, path: &str| {
            if node.end_of_word {
                out.push(word_at(node, path));
            }
            Visit::Descend
        };

        if prefix.is_empty() {
            if self.stream.peek()?.is_none() {
                return Ok(());
            }
            return walk(&mut self.stream, 0, &mut String::new(), &mut collect);
        }

        let node = match self.locate(prefix)? {
            Some(node) => node,
            None => return Ok(()),
        };
        let mut path: String = prefix.iter().collect();
        if node.end_of_word {
            collect(&node, &path);
        }
        if node.has_child {
            walk(&mut self.stream, node.depth + 1, &mut path, &mut collect)?;
        }
        Ok(())
    }

    /// Every word within `max_edits` edits of `word`, nearest first
    pub fn near(&mut self, word: &str, max_edits: usize) -> Result<Vec<Word>> {
        let target: Vec<char> = word.chars().collect();
        let max_len = target.len().saturating_add(max_edits);
        let mut words = Vec::new();

        for segment in 0..self.segment_count() {
            self.seek_segment(segment)?;
            if self.stream.peek()?.is_none() {
                continue;
            }

            let resolver = &self.resolver;
            let mut rows = vec![resolver.initial_row(&target)];
            let mut visit = |node: &TrieNode, path: &str| {
                let depth = node.depth as usize;
                rows.truncate(depth + 1);
                let row = resolver.next_row(&rows[depth], &target, node.value);
                let distance = row[target.len()];

                if node.end_of_word && distance <= max_edits {
                    words.push(word_at(node, path).with_distance(distance));
                }

                // Children are one character longer than this node's path
                let reachable = row_lower_bound(&row) <= max_edits && depth + 2 <= max_len;
                rows.push(row);
                if reachable {
                    Visit::Descend
                } else {
                    Visit::SkipChildren
                }
            };
            walk(&mut self.stream, 0, &mut String::new(), &mut visit)?;
        }

        words.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.value.cmp(&b.value)));
        debug!("Fuzzy lookup for '{}' (max {} edits) found {} words", word, max_edits, words.len());
        Ok(words)
    }

    /// Every word `w` with `lower <= w <= upper`, sorted
    pub fn within_range(&mut self, lower: &str, upper: &str) -> Result<Vec<Word>> {
        let mut words = Vec::new();
        if lower > upper {
            return Ok(words);
        }

        for segment in 0..self.segment_count() {
            self.seek_segment(segment)?;
            if self.stream.peek()?.is_none() {
                continue;
            }

            let mut visit = |node: &TrieNode, path: &str| {
                // Preorder with sorted siblings is lexicographic order, so
                // nothing after a word past `upper` can be in range
                if path > upper {
                    return Visit::Stop;
                }
                if path < lower && !lower.starts_with(path) {
                    return Visit::SkipChildren;
                }
                if node.end_of_word && path >= lower {
                    words.push(word_at(node, path));
                }
                Visit::Descend
            };
            walk(&mut self.stream, 0, &mut String::new(), &mut visit)?;
        }

        words.sort_by(|a, b| a.value.cmp(&b.value));
        Ok(words)
    }

    /// Follow `chars` down from the start of the current segment.
    ///
    /// Returns the node for the last character, with the stream positioned
    /// at its first child.
    fn locate(&mut self, chars: &[char]) -> Result<Option<TrieNode>> {
        let mut depth = 0usize;
        loop {
            let node = match self.stream.step()? {
                Some(node) => node,
                None if depth == 0 => return Ok(None),
                None => return Err(TriedexError::corrupt("segment ends inside a subtree")),
            };
            if node.depth as usize != depth {
                return Err(misaligned(&node, depth));
            }

            let wanted = chars[depth];
            if node.value == wanted {
                if depth + 1 == chars.len() {
                    return Ok(Some(node));
                }
                if !node.has_child {
                    return Ok(None);
                }
                depth += 1;
                continue;
            }

            // Siblings are sorted, so the wanted character cannot follow
            if node.value > wanted {
                return Ok(None);
            }
            if node.has_child {
                self.stream.skip(node.descendants())?;
            }
            if !node.has_sibling {
                return Ok(None);
            }
        }
    }
}

fn word_at(node: &TrieNode, path: &str) -> Word {
    Word {
        value: path.to_string(),
        address: node.address,
        distance: None,
    }
}

fn misaligned(node: &TrieNode, expected: usize) -> TriedexError {
    tracing::warn!(
        "Trie record '{}' at depth {} where depth {} was expected",
        node.value,
        node.depth,
        expected
    );
    TriedexError::corrupt(format!(
        "record '{}' has depth {}, expected {}",
        node.value, node.depth, expected
    ))
}

/// Depth-first walk over a sibling chain starting at `depth` and all of its
/// subtrees. `path` holds the characters above the chain and is extended with
/// each visited node's character before `visit` sees it.
fn walk<R, F>(stream: &mut NodeStream<R>, depth: u32, path: &mut String, visit: &mut F) -> Result<()>
where
    R: Read + Seek,
    F: FnMut(&TrieNode, &str) -> Visit,
{
    let base_len = path.len();
    // (depth, path length) of siblings still to be visited
    let mut pending: Vec<(u32, usize)> = Vec::new();
    let mut expected = depth;

    loop {
        let node = stream
            .step()?
            .ok_or_else(|| TriedexError::corrupt("segment ends inside a subtree"))?;
        if node.depth != expected {
            return Err(misaligned(&node, expected as usize));
        }

        let parent_len = path.len();
        path.push(node.value);
        let action = visit(&node, path);
        if node.has_sibling {
            pending.push((node.depth, parent_len));
        }

        match action {
            Visit::Stop => {
                path.truncate(base_len);
                return Ok(());
            }
            Visit::Descend if node.has_child => {
                expected = node.depth + 1;
                continue;
            }
            _ if node.has_child => stream.skip(node.descendants())?,
            _ => {}
        }

        match pending.pop() {
            Some((sibling_depth, len)) => {
                path.truncate(len);
                expected = sibling_depth;
            }
            None => {
                path.truncate(base_len);
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::builder::LcrsTrie;
    use crate::trie::types::{BlockAddress, RECORD_SIZE};
    use crate::trie::writer::TrieWriter;
    use std::io::Cursor;

    const WORDS: &[&str] = &[
        "rain", "rainy", "rained", "raid", "man", "mane", "check", "cheek", "sunny", "day",
        "the", "then", "a",
    ];

    fn encode(words: &[&str], bucket_count: usize, prefix_len: usize) -> (Vec<u8>, SegmentIndex) {
        let mut tries = vec![LcrsTrie::new(); bucket_count];
        for (i, word) in words.iter().enumerate() {
            let trie = &mut tries[bucket_of(word, prefix_len, bucket_count)];
            let node = trie.insert(word).unwrap();
            trie.set_address(node, BlockAddress::new(i as u64 * 10, 10));
        }
        let mut writer = TrieWriter::new(Vec::new());
        for trie in &tries {
            writer.write_segment(trie).unwrap();
        }
        writer.finish().unwrap()
    }

    fn reader_of(words: &[&str], bucket_count: usize, prefix_len: usize) -> TrieReader<Cursor<Vec<u8>>> {
        let (bytes, index) = encode(words, bucket_count, prefix_len);
        TrieReader::new(Cursor::new(bytes), index, prefix_len).unwrap()
    }

    fn values(words: &[Word]) -> Vec<&str> {
        words.iter().map(|w| w.value.as_str()).collect()
    }

    #[test]
    fn test_is_word() {
        let mut reader = reader_of(WORDS, 4, 1);
        for (i, word) in WORDS.iter().enumerate() {
            let found = reader.is_word(word).unwrap().unwrap();
            assert_eq!(found.value, *word);
            assert_eq!(found.address, Some(BlockAddress::new(i as u64 * 10, 10)));
        }

        for missing in ["rai", "rains", "ma", "zebra", "b", "thee"] {
            assert!(reader.is_word(missing).unwrap().is_none(), "{}", missing);
        }
        assert!(reader.is_word("").unwrap().is_none());
    }

    #[test]
    fn test_is_word_any_segment() {
        let mut reader = reader_of(WORDS, 8, 2);
        assert!(reader.is_word_any_segment("cheek").unwrap().is_some());
        assert!(reader.is_word_any_segment("cheeks").unwrap().is_none());
    }

    #[test]
    fn test_starts_with() {
        let mut reader = reader_of(WORDS, 4, 1);
        assert_eq!(
            values(&reader.starts_with("rai").unwrap()),
            vec!["raid", "rain", "rained", "rainy"]
        );
        assert_eq!(values(&reader.starts_with("rain").unwrap()), vec!["rain", "rained", "rainy"]);
        assert_eq!(values(&reader.starts_with("the").unwrap()), vec!["the", "then"]);
        assert!(reader.starts_with("x").unwrap().is_empty());
        assert!(reader.starts_with("mans").unwrap().is_empty());
    }

    #[test]
    fn test_starts_with_short_prefix_scans_all_segments() {
        // With two hashed characters, "r" words may sit in several segments
        let mut reader = reader_of(WORDS, 8, 2);
        assert_eq!(
            values(&reader.starts_with("r").unwrap()),
            vec!["raid", "rain", "rained", "rainy"]
        );

        let mut all: Vec<&str> = WORDS.to_vec();
        all.sort();
        assert_eq!(values(&reader.starts_with("").unwrap()), all);
    }

    #[test]
    fn test_near() {
        let mut reader = reader_of(WORDS, 4, 1);
        let found = reader.near("rain", 1).unwrap();
        assert_eq!(values(&found), vec!["rain", "raid", "rainy"]);
        assert_eq!(found[0].distance, Some(0));
        assert_eq!(found[1].distance, Some(1));

        let found = reader.near("chek", 1).unwrap();
        assert_eq!(values(&found), vec!["check", "cheek"]);

        assert!(reader.near("zzzz", 1).unwrap().is_empty());
        assert_eq!(values(&reader.near("b", 1).unwrap()), vec!["a"]);
    }

    #[test]
    fn test_near_with_unbounded_budget_returns_every_word() {
        let mut reader = reader_of(WORDS, 4, 1);
        let found = reader.near("rain", usize::MAX).unwrap();
        assert_eq!(found.len(), WORDS.len());
        assert_eq!(found[0].value, "rain");
    }

    #[test]
    fn test_within_range() {
        let mut reader = reader_of(WORDS, 4, 1);
        assert_eq!(
            values(&reader.within_range("mane", "rain").unwrap()),
            vec!["mane", "raid", "rain"]
        );
        assert_eq!(
            values(&reader.within_range("ra", "raz").unwrap()),
            vec!["raid", "rain", "rained", "rainy"]
        );
        assert_eq!(values(&reader.within_range("a", "a").unwrap()), vec!["a"]);
        assert!(reader.within_range("z", "a").unwrap().is_empty());
    }

    #[test]
    fn test_empty_segments() {
        let mut reader = reader_of(&[], 4, 1);
        assert!(reader.is_word("rain").unwrap().is_none());
        assert!(reader.starts_with("").unwrap().is_empty());
        assert!(reader.near("rain", 2).unwrap().is_empty());
        assert!(reader.within_range("a", "z").unwrap().is_empty());
    }

    #[test]
    fn test_truncated_stream_is_corruption() {
        let (mut bytes, index) = encode(WORDS, 1, 1);
        bytes.truncate(bytes.len() - RECORD_SIZE - 3);
        let mut reader = TrieReader::new(Cursor::new(bytes), index, 1).unwrap();
        assert!(reader.starts_with("").unwrap_err().is_corruption());
    }

    #[test]
    fn test_depth_mismatch_is_corruption() {
        let (mut bytes, index) = encode(&["ab"], 1, 1);
        // Second record claims depth 5
        bytes[RECORD_SIZE + 5..RECORD_SIZE + 9].copy_from_slice(&5u32.to_le_bytes());
        let mut reader = TrieReader::new(Cursor::new(bytes), index, 1).unwrap();
        assert!(reader.is_word("ab").unwrap_err().is_corruption());
    }

    #[test]
    fn test_open_rejects_empty_index() {
        assert!(TrieReader::new(Cursor::new(Vec::new()), SegmentIndex::default(), 1)
            .err()
            .unwrap()
            .is_corruption());
    }
}
