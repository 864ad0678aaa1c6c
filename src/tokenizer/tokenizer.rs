use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use stop_words::{get, LANGUAGE};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::TokenizerConfig;
use crate::models::{AnalyzedDocument, Document};

/// Text tokenizer with stemming and stopword removal
pub struct Tokenizer {
    config: TokenizerConfig,
    stemmer: Option<Stemmer>,
    stopwords: HashSet<String>,
}

fn language_of(name: &str) -> (Algorithm, LANGUAGE) {
    match name.to_lowercase().as_str() {
        "english" => (Algorithm::English, LANGUAGE::English),
        "french" => (Algorithm::French, LANGUAGE::French),
        "german" => (Algorithm::German, LANGUAGE::German),
        "spanish" => (Algorithm::Spanish, LANGUAGE::Spanish),
        "italian" => (Algorithm::Italian, LANGUAGE::Italian),
        "portuguese" => (Algorithm::Portuguese, LANGUAGE::Portuguese),
        "dutch" => (Algorithm::Dutch, LANGUAGE::Dutch),
        "russian" => (Algorithm::Russian, LANGUAGE::Russian),
        other => {
            tracing::warn!("Unsupported tokenizer language '{}', using english", other);
            (Algorithm::English, LANGUAGE::English)
        }
    }
}

impl Tokenizer {
    /// Create a new tokenizer from configuration
    pub fn new(config: &TokenizerConfig) -> Self {
        let (algorithm, language) = language_of(&config.language);

        let stemmer = if config.stem {
            Some(Stemmer::create(algorithm))
        } else {
            None
        };

        let stopwords = if config.remove_stopwords {
            get(language).into_iter().map(|s| s.to_lowercase()).collect()
        } else {
            HashSet::new()
        };

        Self {
            config: config.clone(),
            stemmer,
            stopwords,
        }
    }

    /// Tokenize text into a vector of terms
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens: Vec<String> = text
            .unicode_words()
            .map(|word| self.normalize(word))
            .filter(|token| {
                let len = token.chars().count();
                len >= self.config.min_token_length
                    && len <= self.config.max_token_length
                    && !self.stopwords.contains(token)
            })
            .collect();

        if let Some(stemmer) = &self.stemmer {
            tokens = tokens
                .into_iter()
                .map(|token| stemmer.stem(&token).to_string())
                .collect();
        }

        tokens
    }

    /// Case-fold a single query token without splitting or stemming it.
    ///
    /// Range bounds are compared with indexed tokens character by
    /// character, so they only get the case folding.
    pub fn normalize(&self, token: &str) -> String {
        if self.config.lowercase {
            token.to_lowercase()
        } else {
            token.to_string()
        }
    }

    /// Split text at word boundaries and case-fold each word, without the
    /// length filter, stopwords or stemming of `tokenize`.
    pub fn split_words(&self, text: &str) -> Vec<String> {
        text.unicode_words().map(|word| self.normalize(word)).collect()
    }

    /// Compute term frequencies for a piece of text
    pub fn compute_term_frequencies(&self, text: &str) -> HashMap<String, u32> {
        let mut freq = HashMap::new();
        for token in self.tokenize(text) {
            *freq.entry(token).or_insert(0) += 1;
        }
        freq
    }

    /// Analyze every field of a document into per-field term frequencies
    pub fn analyze(&self, document: &Document) -> AnalyzedDocument {
        let mut analyzed = AnalyzedDocument::new(document.id);
        for (field, text) in &document.fields {
            for token in self.tokenize(text) {
                analyzed.add_token(field, &token);
            }
        }
        analyzed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min: usize, max: usize) -> TokenizerConfig {
        TokenizerConfig {
            min_token_length: min,
            max_token_length: max,
            ..TokenizerConfig::default()
        }
    }

    #[test]
    fn test_basic_tokenization() {
        let tokenizer = Tokenizer::new(&config(2, 50));
        let tokens = tokenizer.tokenize("Hello World! This is a test.");

        assert_eq!(tokens, vec!["hello", "world", "this", "is", "test"]);
    }

    #[test]
    fn test_stopword_removal() {
        let config = TokenizerConfig {
            remove_stopwords: true,
            ..config(2, 50)
        };

        let tokenizer = Tokenizer::new(&config);
        let tokens = tokenizer.tokenize("This is a document about the system");

        assert!(!tokens.contains(&"this".to_string()));
        assert!(!tokens.contains(&"is".to_string()));
        assert!(!tokens.contains(&"the".to_string()));
        assert!(tokens.contains(&"document".to_string()));
    }

    #[test]
    fn test_stemming() {
        let config = TokenizerConfig {
            stem: true,
            ..config(2, 50)
        };

        let tokenizer = Tokenizer::new(&config);
        let tokens = tokenizer.tokenize("running runs runner");

        assert!(tokens.iter().all(|t| t.starts_with("run")));
    }

    #[test]
    fn test_min_max_token_length_counts_chars() {
        let tokenizer = Tokenizer::new(&config(3, 5));
        let tokens = tokenizer.tokenize("a ab abc abcd abcde abcdef été");

        assert_eq!(tokens, vec!["abc", "abcd", "abcde", "été"]);
    }

    #[test]
    fn test_term_frequencies() {
        let tokenizer = Tokenizer::new(&TokenizerConfig::default());
        let freq = tokenizer.compute_term_frequencies("Apple apple banana");
        assert_eq!(freq.get("apple"), Some(&2));
        assert_eq!(freq.get("banana"), Some(&1));
    }

    #[test]
    fn test_analyze_document() {
        let tokenizer = Tokenizer::new(&TokenizerConfig::default());
        let doc = Document::new(4)
            .with_field("title", "Rain, rain man")
            .with_field("body", "no rain");

        let analyzed = tokenizer.analyze(&doc);
        assert_eq!(analyzed.id, 4);
        assert_eq!(analyzed.frequency("title", "rain"), 2);
        assert_eq!(analyzed.frequency("title", "man"), 1);
        assert_eq!(analyzed.frequency("body", "rain"), 1);
        assert_eq!(analyzed.frequency("body", "man"), 0);
    }

    #[test]
    fn test_split_words_keeps_every_word() {
        let config = TokenizerConfig {
            remove_stopwords: true,
            stem: true,
            ..config(3, 50)
        };
        let tokenizer = Tokenizer::new(&config);
        assert_eq!(tokenizer.split_words("The Rain-Ch"), vec!["the", "rain", "ch"]);
        assert!(tokenizer.split_words("--").is_empty());
    }

    #[test]
    fn test_normalize() {
        let tokenizer = Tokenizer::new(&TokenizerConfig::default());
        assert_eq!(tokenizer.normalize("RaIn"), "rain");

        let case_sensitive = TokenizerConfig {
            lowercase: false,
            ..TokenizerConfig::default()
        };
        assert_eq!(Tokenizer::new(&case_sensitive).normalize("RaIn"), "RaIn");
    }
}
