//! Index manifest for tracking committed generations
//!
//! The manifest is the commit point: generation files are written and synced
//! first, and a generation only becomes visible once a manifest naming it has
//! been atomically renamed into place.

use serde::{Deserialize, Serialize};

use super::types::GenerationId;
use crate::config::IndexSettings;
use crate::models::current_timestamp;
use crate::Result;

/// Metadata for one committed generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationMeta {
    pub id: GenerationId,
    /// Documents written in this generation
    pub doc_count: u64,
    /// Distinct (field, token) pairs
    pub term_count: u64,
    /// Indexed field names, sorted
    pub fields: Vec<String>,
    /// Segments per field trie
    pub bucket_count: usize,
    /// Characters hashed to pick a segment
    pub bucket_prefix_len: usize,
    pub created_at: u64,
}

impl GenerationMeta {
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.binary_search_by(|f| f.as_str().cmp(field)).is_ok()
    }
}

/// The manifest tracks all committed generations
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Manifest version (for format upgrades)
    pub version: u32,
    /// Next generation ID to allocate
    pub next_generation: GenerationId,
    /// Committed generations, oldest first
    pub generations: Vec<GenerationMeta>,
    /// Settings every generation was written with
    pub settings: IndexSettings,
    /// Timestamp of last update
    pub updated_at: u64,
}

impl IndexManifest {
    /// Current manifest format version
    pub const VERSION: u32 = 1;

    /// Create a new empty manifest
    pub fn new(settings: IndexSettings) -> Self {
        Self {
            version: Self::VERSION,
            next_generation: GenerationId::new(0),
            generations: Vec::new(),
            settings,
            updated_at: 0,
        }
    }

    /// Allocate a new generation ID
    pub fn allocate_generation(&mut self) -> GenerationId {
        let id = self.next_generation;
        self.next_generation = id.next();
        id
    }

    /// Record a committed generation
    pub fn add_generation(&mut self, meta: GenerationMeta) {
        self.generations.push(meta);
        self.updated_at = current_timestamp();
    }

    /// Newest committed generation
    pub fn latest(&self) -> Option<&GenerationMeta> {
        self.generations.last()
    }

    pub fn get_generation(&self, id: GenerationId) -> Option<&GenerationMeta> {
        self.generations.iter().find(|g| g.id == id)
    }

    pub fn generation_count(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    /// Documents written across all generations, counting rewrites again
    pub fn total_doc_count(&self) -> u64 {
        self.generations.iter().map(|g| g.doc_count).sum()
    }

    /// Iterate over generations, newest first
    pub fn newest_first(&self) -> impl Iterator<Item = &GenerationMeta> {
        self.generations.iter().rev()
    }

    /// Serialize the manifest to bincode
    pub fn to_bincode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize manifest from bincode
    pub fn from_bincode(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

impl Default for IndexManifest {
    fn default() -> Self {
        Self::new(IndexSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: GenerationId, doc_count: u64) -> GenerationMeta {
        GenerationMeta {
            id,
            doc_count,
            term_count: 10,
            fields: vec!["body".to_string(), "title".to_string()],
            bucket_count: 16,
            bucket_prefix_len: 1,
            created_at: 0,
        }
    }

    #[test]
    fn test_manifest_basic() {
        let mut manifest = IndexManifest::default();
        assert!(manifest.is_empty());
        assert!(manifest.latest().is_none());

        let first = manifest.allocate_generation();
        let second = manifest.allocate_generation();
        assert_eq!(first, GenerationId::new(0));
        assert_eq!(second, GenerationId::new(1));

        manifest.add_generation(meta(first, 3));
        manifest.add_generation(meta(second, 2));

        assert_eq!(manifest.generation_count(), 2);
        assert_eq!(manifest.total_doc_count(), 5);
        assert_eq!(manifest.latest().unwrap().id, second);
        let order: Vec<_> = manifest.newest_first().map(|g| g.id).collect();
        assert_eq!(order, vec![second, first]);
        assert!(manifest.get_generation(first).is_some());
    }

    #[test]
    fn test_has_field() {
        let meta = meta(GenerationId::new(0), 1);
        assert!(meta.has_field("title"));
        assert!(meta.has_field("body"));
        assert!(!meta.has_field("author"));
    }

    #[test]
    fn test_manifest_serialization() {
        let mut manifest = IndexManifest::new(IndexSettings::default().with_bucket_count(4));
        let id = manifest.allocate_generation();
        manifest.add_generation(meta(id, 7));

        let bytes = manifest.to_bincode().unwrap();
        let restored = IndexManifest::from_bincode(&bytes).unwrap();
        assert_eq!(restored, manifest);
        assert_eq!(restored.settings.bucket_count, 4);

        assert!(IndexManifest::from_bincode(&bytes[..bytes.len() / 2]).is_err());
    }
}
