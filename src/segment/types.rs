//! Core types for generation-based storage

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::DocumentId;

/// Generation identifier (monotonically increasing per index)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GenerationId(pub u64);

impl GenerationId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen_{}", self.0)
    }
}

/// A single posting entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub document_id: DocumentId,
    /// Term frequency in this document
    pub term_frequency: u32,
}

impl Posting {
    pub fn new(document_id: DocumentId, term_frequency: u32) -> Self {
        Self {
            document_id,
            term_frequency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_id() {
        let id = GenerationId::new(3);
        assert_eq!(id.next(), GenerationId(4));
        assert_eq!(id.to_string(), "gen_3");
        assert!(GenerationId(1) < GenerationId(2));
    }
}
