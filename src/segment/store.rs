use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use roaring::RoaringBitmap;

use crate::error::TriedexError;
use crate::segment::manifest::IndexManifest;
use crate::segment::types::GenerationId;
use crate::trie::field_file_id;
use crate::Result;

const MANIFEST_FILE: &str = "index.manifest";
const MANIFEST_TMP_FILE: &str = "index.manifest.tmp";
const POSTINGS_FILE: &str = "postings.dat";
const DOCUMENTS_FILE: &str = "docs.bin";

/// Directory layout of an index and persistence of its manifest.
#[derive(Clone, Debug)]
pub struct IndexStore {
    base_dir: PathBuf,
}

impl IndexStore {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        })
    }

    /// Open a directory that must already exist
    pub fn open_existing<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        if !base_dir.is_dir() {
            return Err(TriedexError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("index directory {} does not exist", base_dir.display()),
            )));
        }
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn generation_dir(&self, id: GenerationId) -> PathBuf {
        self.base_dir.join(id.to_string())
    }

    pub fn postings_path(&self, id: GenerationId) -> PathBuf {
        self.generation_dir(id).join(POSTINGS_FILE)
    }

    pub fn documents_path(&self, id: GenerationId) -> PathBuf {
        self.generation_dir(id).join(DOCUMENTS_FILE)
    }

    /// Trie stream and side index paths for one field
    pub fn trie_paths(&self, id: GenerationId, field: &str) -> (PathBuf, PathBuf) {
        let dir = self.generation_dir(id);
        let file_id = field_file_id(field);
        (
            dir.join(format!("{}.tri", file_id)),
            dir.join(format!("{}.six", file_id)),
        )
    }

    pub fn write_documents(&self, id: GenerationId, documents: &RoaringBitmap) -> Result<()> {
        let file = File::create(self.documents_path(id))?;
        let mut out = BufWriter::new(&file);
        documents.serialize_into(&mut out)?;
        out.flush()?;
        drop(out);
        file.sync_all()?;
        Ok(())
    }

    pub fn read_documents(&self, id: GenerationId) -> Result<RoaringBitmap> {
        let path = self.documents_path(id);
        let file = File::open(&path)?;
        RoaringBitmap::deserialize_from(BufReader::new(file)).map_err(|e| {
            TriedexError::corrupt(format!("document set {}: {}", path.display(), e))
        })
    }

    /// Remove a generation directory left behind by a failed commit
    pub fn remove_generation(&self, id: GenerationId) -> Result<()> {
        let dir = self.generation_dir(id);
        if dir.is_dir() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    /// Atomically replace the manifest: write a temp file, sync, rename.
    pub fn save_manifest(&self, manifest: &IndexManifest) -> Result<()> {
        let tmp = self.base_dir.join(MANIFEST_TMP_FILE);
        let bytes = manifest.to_bincode()?;
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, self.base_dir.join(MANIFEST_FILE))?;

        // Persist the rename itself where the platform allows opening directories
        if let Ok(dir) = File::open(&self.base_dir) {
            let _ = dir.sync_all();
        }
        Ok(())
    }

    /// Load the manifest, or `None` for a directory that holds no index yet
    pub fn load_manifest(&self) -> Result<Option<IndexManifest>> {
        let path = self.base_dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        IndexManifest::from_bincode(&bytes)
            .map(Some)
            .map_err(|e| TriedexError::corrupt(format!("manifest {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexSettings;
    use tempfile::TempDir;

    #[test]
    fn test_layout() {
        let tmp = TempDir::new().unwrap();
        let store = IndexStore::new(tmp.path()).unwrap();
        let id = GenerationId::new(2);

        assert_eq!(store.generation_dir(id), tmp.path().join("gen_2"));
        assert_eq!(store.postings_path(id), tmp.path().join("gen_2").join("postings.dat"));

        let (tri, six) = store.trie_paths(id, "title");
        assert_eq!(tri.extension().unwrap(), "tri");
        assert_eq!(six.extension().unwrap(), "six");
        assert_eq!(tri.file_stem(), six.file_stem());
        assert_ne!(store.trie_paths(id, "body").0, tri);
    }

    #[test]
    fn test_manifest_persistence() {
        let tmp = TempDir::new().unwrap();
        let store = IndexStore::new(tmp.path()).unwrap();
        assert!(store.load_manifest().unwrap().is_none());

        let mut manifest = IndexManifest::new(IndexSettings::default().with_bucket_count(2));
        manifest.allocate_generation();
        store.save_manifest(&manifest).unwrap();

        let loaded = store.load_manifest().unwrap().unwrap();
        assert_eq!(loaded, manifest);
        assert!(!tmp.path().join(MANIFEST_TMP_FILE).exists());

        fs::write(tmp.path().join(MANIFEST_FILE), b"junk").unwrap();
        assert!(store.load_manifest().unwrap_err().is_corruption());
    }

    #[test]
    fn test_document_sets() {
        let tmp = TempDir::new().unwrap();
        let store = IndexStore::new(tmp.path()).unwrap();
        let id = GenerationId::new(0);
        fs::create_dir_all(store.generation_dir(id)).unwrap();

        let documents: RoaringBitmap = [1u32, 5, 9].into_iter().collect();
        store.write_documents(id, &documents).unwrap();
        assert_eq!(store.read_documents(id).unwrap(), documents);

        store.remove_generation(id).unwrap();
        assert!(!store.generation_dir(id).exists());
        assert!(store.read_documents(id).is_err());
    }
}
