//! Read access to one committed generation
//!
//! Generation files are never modified after commit, so a reader holds no
//! open handles between calls: every lookup opens its own file handles and
//! any number of lookups may run side by side.

use std::fs::File;

use roaring::RoaringBitmap;

use super::manifest::GenerationMeta;
use super::postings::PostingsReader;
use super::store::IndexStore;
use super::types::{GenerationId, Posting};
use crate::models::DocumentId;
use crate::trie::{TrieReader, Word};
use crate::Result;

/// Reader over one generation's tries and postings
pub struct GenerationReader {
    meta: GenerationMeta,
    documents: RoaringBitmap,
    store: IndexStore,
}

impl GenerationReader {
    /// Open a committed generation.
    ///
    /// Fails if the generation's document set or postings file is missing.
    pub fn open(store: &IndexStore, meta: GenerationMeta) -> Result<Self> {
        let documents = store.read_documents(meta.id)?;
        File::open(store.postings_path(meta.id))?;
        Ok(Self {
            meta,
            documents,
            store: store.clone(),
        })
    }

    pub fn id(&self) -> GenerationId {
        self.meta.id
    }

    pub fn meta(&self) -> &GenerationMeta {
        &self.meta
    }

    /// Documents written in this generation
    pub fn documents(&self) -> &RoaringBitmap {
        &self.documents
    }

    pub fn contains_document(&self, id: DocumentId) -> bool {
        self.documents.contains(id)
    }

    /// Open the trie of a field; `None` if the generation never saw the field
    pub fn trie(&self, field: &str) -> Result<Option<TrieReader<File>>> {
        if !self.meta.has_field(field) {
            return Ok(None);
        }
        let (trie_path, index_path) = self.store.trie_paths(self.meta.id, field);
        TrieReader::open(trie_path, index_path, self.meta.bucket_prefix_len).map(Some)
    }

    pub fn is_word(&self, field: &str, token: &str) -> Result<Option<Word>> {
        match self.trie(field)? {
            Some(mut trie) => trie.is_word(token),
            None => Ok(None),
        }
    }

    pub fn starts_with(&self, field: &str, prefix: &str) -> Result<Vec<Word>> {
        match self.trie(field)? {
            Some(mut trie) => trie.starts_with(prefix),
            None => Ok(Vec::new()),
        }
    }

    pub fn near(&self, field: &str, word: &str, max_edits: usize) -> Result<Vec<Word>> {
        match self.trie(field)? {
            Some(mut trie) => trie.near(word, max_edits),
            None => Ok(Vec::new()),
        }
    }

    pub fn within_range(&self, field: &str, lower: &str, upper: &str) -> Result<Vec<Word>> {
        match self.trie(field)? {
            Some(mut trie) => trie.within_range(lower, upper),
            None => Ok(Vec::new()),
        }
    }

    /// Postings for each word, in the order given. Words without an address
    /// get an empty list.
    pub fn read_postings(&self, words: &[Word]) -> Result<Vec<Vec<Posting>>> {
        if words.iter().all(|w| w.address.is_none()) {
            return Ok(vec![Vec::new(); words.len()]);
        }
        let mut reader = PostingsReader::open(self.store.postings_path(self.meta.id))?;
        let addresses: Vec<_> = words.iter().map(|w| w.address).collect();
        reader.read_many(&addresses)
    }
}
