use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::TriedexError;
use crate::Result;

/// Index settings configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub tokenizer_config: TokenizerConfig,
    /// Similarity threshold for `~` clauses; the edit budget is
    /// `ceil(len * (1 - similarity))`
    pub fuzzy_similarity: f32,
    /// Number of segments each field trie is split into
    pub bucket_count: usize,
    /// Number of leading characters hashed to pick a term's segment
    pub bucket_prefix_len: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            tokenizer_config: TokenizerConfig::default(),
            fuzzy_similarity: 0.75,
            bucket_count: 16,
            bucket_prefix_len: 1,
        }
    }
}

impl IndexSettings {
    /// Load settings from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let settings: IndexSettings = serde_json::from_slice(&data).map_err(|e| {
            TriedexError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Set the fuzzy similarity threshold
    pub fn with_fuzzy_similarity(mut self, similarity: f32) -> Self {
        self.fuzzy_similarity = similarity;
        self
    }

    /// Set the number of trie segments per field
    pub fn with_bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    /// Set the number of characters hashed for bucketing
    pub fn with_bucket_prefix_len(mut self, prefix_len: usize) -> Self {
        self.bucket_prefix_len = prefix_len;
        self
    }

    /// Set the tokenizer configuration
    pub fn with_tokenizer_config(mut self, config: TokenizerConfig) -> Self {
        self.tokenizer_config = config;
        self
    }

    /// Reject settings that would produce an unreadable index
    pub fn validate(&self) -> Result<()> {
        if self.bucket_count == 0 {
            return Err(TriedexError::Config(
                "bucket_count must be at least 1".to_string(),
            ));
        }
        if self.bucket_prefix_len == 0 {
            return Err(TriedexError::Config(
                "bucket_prefix_len must be at least 1".to_string(),
            ));
        }
        if !(self.fuzzy_similarity > 0.0 && self.fuzzy_similarity <= 1.0) {
            return Err(TriedexError::Config(format!(
                "fuzzy_similarity must be in (0, 1], got {}",
                self.fuzzy_similarity
            )));
        }
        if self.tokenizer_config.min_token_length > self.tokenizer_config.max_token_length {
            return Err(TriedexError::Config(
                "min_token_length exceeds max_token_length".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tokenizer configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub lowercase: bool,
    pub remove_stopwords: bool,
    pub stem: bool,
    pub min_token_length: usize,
    pub max_token_length: usize,
    pub language: String,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            remove_stopwords: false,
            stem: false,
            min_token_length: 1,
            max_token_length: 64,
            language: "english".to_string(),
        }
    }
}
