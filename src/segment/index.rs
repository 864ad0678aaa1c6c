//! Index writer: accepts documents and commits them as new generations
//!
//! Committed generations are never touched again. Each commit writes a fresh
//! generation directory and then publishes it by saving a new manifest.

use std::path::Path;

use tracing::{info, warn};

use super::builder::TermBuilder;
use super::manifest::IndexManifest;
use super::store::IndexStore;
use super::types::GenerationId;
use super::writer::GenerationWriter;
use crate::config::IndexSettings;
use crate::error::TriedexError;
use crate::models::{AnalyzedDocument, Document};
use crate::tokenizer::Tokenizer;
use crate::Result;

/// Single writer for an index directory
pub struct IndexWriter {
    store: IndexStore,
    manifest: IndexManifest,
    tokenizer: Tokenizer,
    builder: TermBuilder,
}

impl IndexWriter {
    /// Open an index directory, creating an empty index if none exists.
    ///
    /// An existing index keeps the settings it was created with.
    pub fn open(dir: impl AsRef<Path>, settings: IndexSettings) -> Result<Self> {
        settings.validate()?;
        let store = IndexStore::new(dir)?;

        let manifest = match store.load_manifest()? {
            Some(manifest) => {
                if manifest.settings != settings {
                    warn!(
                        "Index at {} was created with different settings; keeping the stored ones",
                        store.base_dir().display()
                    );
                }
                manifest
            }
            None => {
                let manifest = IndexManifest::new(settings);
                store.save_manifest(&manifest)?;
                manifest
            }
        };

        info!(
            "Opened index at {} ({} generations)",
            store.base_dir().display(),
            manifest.generation_count()
        );

        let tokenizer = Tokenizer::new(&manifest.settings.tokenizer_config);
        let builder = new_builder(&manifest.settings);
        Ok(Self {
            store,
            manifest,
            tokenizer,
            builder,
        })
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.manifest.settings
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Add an already analyzed document to the next generation
    pub fn write(&mut self, document: &AnalyzedDocument) -> Result<()> {
        self.builder.write(document)
    }

    /// Analyze a document and add it to the next generation
    pub fn add_document(&mut self, document: &Document) -> Result<()> {
        let analyzed = self.tokenizer.analyze(document);
        self.write(&analyzed)
    }

    /// Documents waiting for the next commit
    pub fn pending_documents(&self) -> u64 {
        self.builder.doc_count()
    }

    /// Serialize everything written since the last commit as a new
    /// generation and publish it.
    ///
    /// The pending documents are only dropped once the manifest lists the
    /// new generation; after a failure they stay pending and the commit can
    /// be retried.
    pub fn commit(&mut self) -> Result<GenerationId> {
        if self.builder.is_empty() {
            return Err(TriedexError::InvalidRequest(
                "nothing to commit".to_string(),
            ));
        }

        let settings = self.manifest.settings.clone();
        let mut manifest = self.manifest.clone();
        let id = manifest.allocate_generation();
        let writer = GenerationWriter::new(
            &self.store,
            id,
            settings.bucket_count,
            settings.bucket_prefix_len,
        );

        let published = writer.write(&self.builder).and_then(|meta| {
            let summary = (meta.doc_count, meta.term_count);
            manifest.add_generation(meta);
            self.store.save_manifest(&manifest).map(|_| summary)
        });

        let (doc_count, term_count) = match published {
            Ok(summary) => summary,
            Err(e) => {
                warn!(
                    "Commit of {} failed, {} documents stay pending: {}",
                    id,
                    self.builder.doc_count(),
                    e
                );
                if let Err(cleanup) = self.store.remove_generation(id) {
                    warn!("Could not remove partial {}: {}", id, cleanup);
                }
                return Err(e);
            }
        };

        info!(
            "Committed {} with {} documents and {} terms",
            id, doc_count, term_count
        );
        self.manifest = manifest;
        self.builder = new_builder(&settings);
        Ok(id)
    }
}

fn new_builder(settings: &IndexSettings) -> TermBuilder {
    TermBuilder::new(settings.bucket_count, settings.bucket_prefix_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_commit_creates_generations() {
        let tmp = TempDir::new().unwrap();
        let mut writer = IndexWriter::open(tmp.path(), IndexSettings::default()).unwrap();

        writer
            .add_document(&Document::new(1).with_field("title", "the rain man"))
            .unwrap();
        assert_eq!(writer.pending_documents(), 1);
        let first = writer.commit().unwrap();
        assert_eq!(first, GenerationId::new(0));
        assert_eq!(writer.pending_documents(), 0);

        writer
            .add_document(&Document::new(2).with_field("title", "rain check"))
            .unwrap();
        let second = writer.commit().unwrap();
        assert_eq!(second, GenerationId::new(1));

        let reopened = IndexWriter::open(tmp.path(), IndexSettings::default()).unwrap();
        assert_eq!(reopened.manifest().generation_count(), 2);
        assert_eq!(reopened.manifest().latest().unwrap().id, second);
    }

    #[test]
    fn test_empty_commit_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut writer = IndexWriter::open(tmp.path(), IndexSettings::default()).unwrap();
        assert!(matches!(
            writer.commit(),
            Err(TriedexError::InvalidRequest(_))
        ));
        assert!(writer.manifest().is_empty());
    }

    #[test]
    fn test_same_document_twice_in_one_generation() {
        let tmp = TempDir::new().unwrap();
        let mut writer = IndexWriter::open(tmp.path(), IndexSettings::default()).unwrap();
        let doc = Document::new(5).with_field("title", "sunny day");
        writer.add_document(&doc).unwrap();
        assert!(writer.add_document(&doc).is_err());

        // A later generation may rewrite it
        writer.commit().unwrap();
        writer.add_document(&doc).unwrap();
        writer.commit().unwrap();
    }

    #[test]
    fn test_failed_commit_keeps_pending_documents() {
        let tmp = TempDir::new().unwrap();
        let mut writer = IndexWriter::open(tmp.path(), IndexSettings::default()).unwrap();
        writer
            .add_document(&Document::new(1).with_field("title", "rain man"))
            .unwrap();

        // A plain file where the generation directory should go
        let blocker = tmp.path().join("gen_0");
        std::fs::write(&blocker, b"in the way").unwrap();
        assert!(matches!(writer.commit(), Err(TriedexError::Io(_))));
        assert_eq!(writer.pending_documents(), 1);
        assert!(writer.manifest().is_empty());

        std::fs::remove_file(&blocker).unwrap();
        let id = writer.commit().unwrap();
        assert_eq!(id, GenerationId::new(0));
        assert_eq!(writer.pending_documents(), 0);

        let reopened = IndexWriter::open(tmp.path(), IndexSettings::default()).unwrap();
        let meta = reopened.manifest().latest().unwrap();
        assert_eq!((meta.id, meta.doc_count), (id, 1));
    }

    #[test]
    fn test_stored_settings_win() {
        let tmp = TempDir::new().unwrap();
        IndexWriter::open(tmp.path(), IndexSettings::default().with_bucket_count(3)).unwrap();

        let writer = IndexWriter::open(tmp.path(), IndexSettings::default()).unwrap();
        assert_eq!(writer.settings().bucket_count, 3);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let tmp = TempDir::new().unwrap();
        let result = IndexWriter::open(tmp.path(), IndexSettings::default().with_bucket_count(0));
        assert!(matches!(result, Err(TriedexError::Config(_))));
    }
}
