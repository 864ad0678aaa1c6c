//! Text analysis: splits field text into normalized tokens

#[allow(clippy::module_inception)]
mod tokenizer;

pub use tokenizer::Tokenizer;
