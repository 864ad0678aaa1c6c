//! Edit-distance strategies for fuzzy lookups
//!
//! Fuzzy traversal extends a candidate one character per trie level, so a
//! resolver works on dynamic-programming rows: each row holds the distance
//! between the candidate prefix seen so far and every prefix of the target.

/// Pluggable edit-distance strategy
pub trait DistanceResolver: Send + Sync {
    /// Row for the empty candidate against `target`
    fn initial_row(&self, target: &[char]) -> Vec<usize> {
        (0..=target.len()).collect()
    }

    /// Row after appending `c` to the candidate
    fn next_row(&self, prev: &[usize], target: &[char], c: char) -> Vec<usize>;

    /// Exact distance between two strings
    fn distance(&self, a: &str, b: &str) -> usize {
        let target: Vec<char> = b.chars().collect();
        let mut row = self.initial_row(&target);
        for c in a.chars() {
            row = self.next_row(&row, &target, c);
        }
        row[target.len()]
    }
}

/// Classic Levenshtein distance (insert, delete, substitute, each cost 1)
#[derive(Clone, Copy, Debug, Default)]
pub struct Levenshtein;

impl DistanceResolver for Levenshtein {
    fn next_row(&self, prev: &[usize], target: &[char], c: char) -> Vec<usize> {
        let mut row = vec![0usize; prev.len()];
        row[0] = prev[0] + 1;
        for j in 1..prev.len() {
            let cost = if target[j - 1] == c { 0 } else { 1 };
            row[j] = std::cmp::min(
                std::cmp::min(
                    prev[j] + 1,    // deletion
                    row[j - 1] + 1, // insertion
                ),
                prev[j - 1] + cost, // substitution
            );
        }
        row
    }
}

/// Smallest distance any extension of the candidate can still reach
pub fn row_lower_bound(row: &[usize]) -> usize {
    row.iter().copied().min().unwrap_or(0)
}
