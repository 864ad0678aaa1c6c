//! Generation writer
//!
//! Serializes a finished term builder into an immutable generation
//! directory: one postings file, the generation's document set and a trie
//! stream plus side index per field. Every file is synced before the
//! generation's metadata is handed back for the manifest.

use std::fs::{self, File};
use std::io::BufWriter;

use tracing::debug;

use super::builder::TermBuilder;
use super::manifest::GenerationMeta;
use super::postings::PostingsWriter;
use super::store::IndexStore;
use super::types::GenerationId;
use crate::models::current_timestamp;
use crate::trie::write_field_files;
use crate::Result;

/// Writer for one new generation
pub struct GenerationWriter<'a> {
    store: &'a IndexStore,
    id: GenerationId,
    bucket_count: usize,
    bucket_prefix_len: usize,
}

impl<'a> GenerationWriter<'a> {
    pub fn new(
        store: &'a IndexStore,
        id: GenerationId,
        bucket_count: usize,
        bucket_prefix_len: usize,
    ) -> Self {
        Self {
            store,
            id,
            bucket_count,
            bucket_prefix_len,
        }
    }

    /// Write every file of the generation
    pub fn write(&self, builder: &TermBuilder) -> Result<GenerationMeta> {
        let dir = self.store.generation_dir(self.id);
        fs::create_dir_all(&dir)?;

        let file = File::create(self.store.postings_path(self.id))?;
        let mut postings = PostingsWriter::new(BufWriter::new(file));
        let built = builder.finish(&mut postings)?;
        let postings_len = postings.position();
        postings
            .finish()?
            .into_inner()
            .map_err(|e| e.into_error())?
            .sync_all()?;

        let mut fields = Vec::with_capacity(built.fields.len());
        for (field, tries) in &built.fields {
            let (trie_path, index_path) = self.store.trie_paths(self.id, field);
            write_field_files(&trie_path, &index_path, tries)?;
            debug!(
                "Wrote {} trie for field '{}' ({} segments)",
                self.id,
                field,
                tries.len()
            );
            fields.push(field.clone());
        }

        self.store.write_documents(self.id, &built.documents)?;
        debug!("Wrote {} postings ({} bytes)", self.id, postings_len);

        Ok(GenerationMeta {
            id: self.id,
            doc_count: built.documents.len(),
            term_count: built.term_count as u64,
            fields,
            bucket_count: self.bucket_count,
            bucket_prefix_len: self.bucket_prefix_len,
            created_at: current_timestamp(),
        })
    }
}
