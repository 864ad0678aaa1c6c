//! Query string parser
//!
//! Parses whitespace-separated clauses of the form `[+|-]field:value[*|~N]`
//! into a `QueryTree`.
//!
//! ```text
//! query   := clause (WS+ clause)*
//! clause  := ('+' | '-')? FIELD ':' value
//! value   := '"' TEXT '"' suffix? | '[' TEXT WS+ 'TO' WS+ TEXT ']' | WORD suffix?
//! suffix  := '*' | '~' DIGITS?
//! ```
//!
//! `+` requires a clause, `-` excludes it and a bare clause is optional. The
//! first clause is always required.

use crate::config::IndexSettings;
use crate::error::TriedexError;
use crate::query::types::{Occur, QueryClause, QueryTree, TermMatch};
use crate::tokenizer::Tokenizer;
use crate::Result;

/// Largest explicit `~N` budget accepted
pub const MAX_EDIT_DISTANCE: usize = 16;

/// Raw value of a clause before analysis
#[derive(Debug, Clone, PartialEq)]
enum RawValue {
    Word(String),
    Quoted(String),
    Range(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Suffix {
    None,
    Prefix,
    Fuzzy(Option<usize>),
}

#[derive(Debug, Clone, PartialEq)]
struct RawClause {
    occur: Option<Occur>,
    field: String,
    value: RawValue,
    suffix: Suffix,
}

/// Character scanner splitting a query string into raw clauses
struct Scanner {
    input: Vec<char>,
    position: usize,
}

impl Scanner {
    fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.current().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }

    fn at_clause_end(&self) -> bool {
        self.current().map_or(true, char::is_whitespace)
    }

    fn error(&self, message: impl std::fmt::Display) -> TriedexError {
        TriedexError::QueryParseError(format!("{} at position {}", message, self.position))
    }

    fn next_clause(&mut self) -> Result<Option<RawClause>> {
        self.skip_whitespace();
        let first = match self.current() {
            Some(c) => c,
            None => return Ok(None),
        };

        let occur = match first {
            '+' => Some(Occur::Must),
            '-' => Some(Occur::MustNot),
            _ => None,
        };
        if occur.is_some() {
            self.advance();
        }

        let field = self.read_field()?;
        let (value, suffix) = match self.current() {
            Some('"') => {
                let text = self.read_quoted()?;
                (RawValue::Quoted(text), self.read_suffix()?)
            }
            Some('[') => {
                let (lower, upper) = self.read_range()?;
                (RawValue::Range(lower, upper), Suffix::None)
            }
            _ => self.read_word()?,
        };

        if !self.at_clause_end() {
            return Err(self.error("expected whitespace between clauses"));
        }

        Ok(Some(RawClause {
            occur,
            field,
            value,
            suffix,
        }))
    }

    fn read_field(&mut self) -> Result<String> {
        let mut field = String::new();
        loop {
            match self.current() {
                Some(':') => {
                    self.advance();
                    break;
                }
                Some(c) if !c.is_whitespace() => {
                    field.push(c);
                    self.advance();
                }
                _ => {
                    return Err(self.error(format!("missing ':' after '{}'", field)));
                }
            }
        }
        if field.is_empty() {
            return Err(self.error("missing field name before ':'"));
        }
        Ok(field)
    }

    fn read_quoted(&mut self) -> Result<String> {
        self.advance();
        let mut text = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    return Ok(text);
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
                None => return Err(self.error("unterminated quoted value")),
            }
        }
    }

    fn read_range(&mut self) -> Result<(String, String)> {
        self.advance();
        let mut body = String::new();
        loop {
            match self.current() {
                Some(']') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    body.push(c);
                    self.advance();
                }
                None => return Err(self.error("unterminated range")),
            }
        }

        let parts: Vec<&str> = body.split_whitespace().collect();
        match parts.as_slice() {
            [lower, "TO", upper] => Ok((lower.to_string(), upper.to_string())),
            _ => Err(self.error(format!("expected '[lower TO upper]', found '[{}]'", body))),
        }
    }

    /// Read a bare value; a trailing `*` or `~N` becomes the suffix
    fn read_word(&mut self) -> Result<(RawValue, Suffix)> {
        let mut word = String::new();
        while let Some(c) = self.current() {
            if c.is_whitespace() || c == '*' || c == '~' {
                break;
            }
            word.push(c);
            self.advance();
        }
        if word.is_empty() {
            return Err(self.error("missing value after ':'"));
        }
        let suffix = self.read_suffix()?;
        Ok((RawValue::Word(word), suffix))
    }

    fn read_suffix(&mut self) -> Result<Suffix> {
        match self.current() {
            Some('*') => {
                self.advance();
                Ok(Suffix::Prefix)
            }
            Some('~') => {
                self.advance();
                let mut digits = String::new();
                while let Some(c) = self.current().filter(char::is_ascii_digit) {
                    digits.push(c);
                    self.advance();
                }
                if digits.is_empty() {
                    return Ok(Suffix::Fuzzy(None));
                }
                match digits.parse::<usize>() {
                    Ok(n) if n <= MAX_EDIT_DISTANCE => Ok(Suffix::Fuzzy(Some(n))),
                    _ => Err(self.error(format!(
                        "edit distance '{}' exceeds the maximum of {}",
                        digits, MAX_EDIT_DISTANCE
                    ))),
                }
            }
            _ => Ok(Suffix::None),
        }
    }
}

/// Parses query strings, analyzing values the way documents were analyzed
pub struct QueryParser {
    tokenizer: Tokenizer,
    fuzzy_similarity: f32,
}

impl QueryParser {
    pub fn new(settings: &IndexSettings) -> Self {
        Self {
            tokenizer: Tokenizer::new(&settings.tokenizer_config),
            fuzzy_similarity: settings.fuzzy_similarity,
        }
    }

    /// Parse a query string into a clause tree
    pub fn parse(&self, query: &str) -> Result<QueryTree> {
        let mut scanner = Scanner::new(query);
        let mut clauses = Vec::new();

        while let Some(raw) = scanner.next_clause()? {
            let occur = if clauses.is_empty() {
                Occur::Must
            } else {
                raw.occur.unwrap_or(Occur::Should)
            };
            clauses.push(self.build_clause(occur, raw));
        }

        if clauses.is_empty() {
            return Err(TriedexError::QueryParseError("empty query".to_string()));
        }
        Ok(QueryTree::new(clauses))
    }

    fn build_clause(&self, occur: Occur, raw: RawClause) -> QueryClause {
        let mut clause = QueryClause::new(occur, raw.field);

        let text = match raw.value {
            RawValue::Range(lower, upper) => {
                clause.terms.push(TermMatch::Range {
                    lower: self.tokenizer.normalize(&lower),
                    upper: self.tokenizer.normalize(&upper),
                });
                return clause;
            }
            RawValue::Word(text) | RawValue::Quoted(text) => text,
        };

        clause.terms = match raw.suffix {
            Suffix::None => self
                .tokenizer
                .tokenize(&text)
                .into_iter()
                .map(TermMatch::Exact)
                .collect(),
            Suffix::Prefix => self
                .tokenizer
                .split_words(&text)
                .into_iter()
                .map(TermMatch::Prefix)
                .collect(),
            Suffix::Fuzzy(edits) => self
                .tokenizer
                .split_words(&text)
                .into_iter()
                .map(|value| {
                    let max_edits = edits.unwrap_or_else(|| self.edit_budget(&value));
                    TermMatch::Fuzzy { value, max_edits }
                })
                .collect(),
        };
        clause
    }

    /// `ceil(len * (1 - similarity))`
    pub fn edit_budget(&self, value: &str) -> usize {
        let len = value.chars().count() as f64;
        let budget = len * (1.0 - self.fuzzy_similarity as f64);
        // Absorb f32 representation error before rounding up
        (budget - 1e-6).ceil().max(0.0) as usize
    }
}
