//! Searcher over every committed generation of an index
//!
//! Generations are searched newest first. A document id written by a newer
//! generation shadows every older copy of that document, whether or not the
//! newer copy matches the query, so each document is answered by its latest
//! version only.

use std::path::Path;
use std::time::Instant;

use roaring::RoaringBitmap;
use tracing::{debug, info};

use crate::config::IndexSettings;
use crate::error::TriedexError;
use crate::models::SearchResponse;
use crate::query::executor::{rank, QueryExecutor};
use crate::query::parser::QueryParser;
use crate::query::scoring::{ScoringScheme, TfIdf};
use crate::query::types::QueryTree;
use crate::segment::{GenerationReader, IndexManifest, IndexStore};
use crate::Result;

/// Read-only view of an index as of the manifest it was opened with
pub struct Searcher {
    manifest: IndexManifest,
    /// Oldest first, as in the manifest
    generations: Vec<GenerationReader>,
    parser: QueryParser,
    scoring: Box<dyn ScoringScheme>,
    total_docs: u64,
}

impl Searcher {
    /// Open every committed generation of the index in `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let store = IndexStore::open_existing(dir)?;
        let manifest = store.load_manifest()?.ok_or_else(|| {
            TriedexError::InvalidRequest(format!(
                "no index found in {}",
                store.base_dir().display()
            ))
        })?;

        let mut generations = Vec::with_capacity(manifest.generation_count());
        let mut documents = RoaringBitmap::new();
        for meta in &manifest.generations {
            let reader = GenerationReader::open(&store, meta.clone())?;
            documents |= reader.documents();
            generations.push(reader);
        }

        info!(
            "Opened searcher on {} ({} generations, {} documents)",
            store.base_dir().display(),
            generations.len(),
            documents.len()
        );

        Ok(Self {
            parser: QueryParser::new(&manifest.settings),
            manifest,
            generations,
            scoring: Box::new(TfIdf),
            total_docs: documents.len(),
        })
    }

    /// Replace the relevance model
    pub fn with_scoring(mut self, scoring: Box<dyn ScoringScheme>) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.manifest.settings
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Generation readers, oldest first
    pub fn generations(&self) -> &[GenerationReader] {
        &self.generations
    }

    /// Distinct documents across all generations
    pub fn total_docs(&self) -> u64 {
        self.total_docs
    }

    /// Parse a query with the index's analysis settings
    pub fn parse(&self, query: &str) -> Result<QueryTree> {
        self.parser.parse(query)
    }

    /// Run a parsed query and return one page of ranked hits
    pub fn search(&self, tree: &QueryTree, skip: usize, take: usize) -> Result<SearchResponse> {
        let start = Instant::now();

        let mut shadowed = RoaringBitmap::new();
        let mut hits = Vec::new();
        for generation in self.generations.iter().rev() {
            let executor = QueryExecutor::new(generation, self.scoring.as_ref(), self.total_docs);
            let results = executor.execute(tree)?;
            hits.extend(
                results
                    .into_iter()
                    .filter(|hit| !shadowed.contains(hit.document_id)),
            );
            shadowed |= generation.documents();
        }

        rank(&mut hits);
        let total_hits = hits.len() as u64;
        let hits: Vec<_> = hits.into_iter().skip(skip).take(take).collect();
        let took_ms = start.elapsed().as_millis() as u64;

        debug!(
            "Query '{}' matched {} documents, returning {} ({} ms)",
            tree, total_hits, hits.len(), took_ms
        );

        Ok(SearchResponse {
            hits,
            total_hits,
            took_ms,
        })
    }

    /// Parse and run a query string
    pub fn search_str(&self, query: &str, skip: usize, take: usize) -> Result<SearchResponse> {
        let tree = self.parse(query)?;
        self.search(&tree, skip, take)
    }
}
