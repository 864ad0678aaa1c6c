//! Term Builder
//!
//! Collects analyzed documents for the next generation: every token goes into
//! its field's bucket trie and its postings are accumulated in memory until
//! the generation is committed.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use roaring::RoaringBitmap;

use super::postings::PostingsWriter;
use super::types::Posting;
use crate::error::TriedexError;
use crate::models::{AnalyzedDocument, DocumentId};
use crate::trie::builder::NodeId;
use crate::trie::{bucket_of, LcrsTrie};
use crate::Result;

struct TermSlot {
    bucket: usize,
    node: NodeId,
    postings: Vec<Posting>,
}

/// Terms of one field, split into bucket tries
struct FieldTerms {
    tries: Vec<LcrsTrie>,
    terms: HashMap<String, TermSlot>,
}

impl FieldTerms {
    fn new(bucket_count: usize) -> Self {
        Self {
            tries: vec![LcrsTrie::new(); bucket_count],
            terms: HashMap::new(),
        }
    }
}

/// Tries of a finished generation, with postings addresses filled in
pub struct BuiltGeneration {
    /// Bucket tries per field, in field name order
    pub fields: Vec<(String, Vec<LcrsTrie>)>,
    pub documents: RoaringBitmap,
    pub term_count: usize,
}

/// Accumulates one generation's terms and postings.
///
/// Not safe for concurrent mutation; callers analyze documents in parallel
/// and feed the builder serially.
pub struct TermBuilder {
    bucket_count: usize,
    prefix_len: usize,
    fields: BTreeMap<String, FieldTerms>,
    documents: RoaringBitmap,
}

impl TermBuilder {
    pub fn new(bucket_count: usize, prefix_len: usize) -> Self {
        Self {
            bucket_count: bucket_count.max(1),
            prefix_len: prefix_len.max(1),
            fields: BTreeMap::new(),
            documents: RoaringBitmap::new(),
        }
    }

    /// Add one analyzed document.
    ///
    /// A document id may only be written once per generation.
    pub fn write(&mut self, document: &AnalyzedDocument) -> Result<()> {
        if self.documents.contains(document.id) {
            return Err(TriedexError::InvalidRequest(format!(
                "document {} was already written to this generation",
                document.id
            )));
        }

        for (term, &count) in &document.terms {
            if count == 0 || term.token().is_empty() {
                continue;
            }

            let bucket_count = self.bucket_count;
            let field = self
                .fields
                .entry(term.field.clone())
                .or_insert_with(|| FieldTerms::new(bucket_count));

            let bucket = bucket_of(term.token(), self.prefix_len, bucket_count);
            let slot = match field.terms.entry(term.token().to_string()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let node = field.tries[bucket].insert(term.token()).ok_or_else(|| {
                        TriedexError::Internal("empty token reached the trie".to_string())
                    })?;
                    entry.insert(TermSlot {
                        bucket,
                        node,
                        postings: Vec::new(),
                    })
                }
            };
            slot.postings.push(Posting::new(document.id, count));
        }

        self.documents.insert(document.id);
        Ok(())
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.documents.contains(id)
    }

    pub fn doc_count(&self) -> u64 {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Distinct (field, token) pairs written so far
    pub fn term_count(&self) -> usize {
        self.fields.values().map(|f| f.terms.len()).sum()
    }

    /// Write every postings list and return address-filled copies of the
    /// tries. The builder itself is left untouched so a failed commit can be
    /// retried.
    pub fn finish<W: Write>(&self, postings: &mut PostingsWriter<W>) -> Result<BuiltGeneration> {
        let mut fields = Vec::with_capacity(self.fields.len());

        for (name, field) in &self.fields {
            let mut tries = field.tries.clone();

            // Token order keeps postings files reproducible
            let mut terms: Vec<(&String, &TermSlot)> = field.terms.iter().collect();
            terms.sort_by(|a, b| a.0.cmp(b.0));

            for (_, slot) in terms {
                let mut list = slot.postings.clone();
                list.sort_by_key(|p| p.document_id);
                let address = postings.append(&list)?;
                tries[slot.bucket].set_address(slot.node, address);
            }
            fields.push((name.clone(), tries));
        }

        Ok(BuiltGeneration {
            fields,
            documents: self.documents.clone(),
            term_count: self.term_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::postings::PostingsReader;
    use std::io::Cursor;

    fn doc(id: DocumentId, terms: &[(&str, &str, u32)]) -> AnalyzedDocument {
        terms
            .iter()
            .fold(AnalyzedDocument::new(id), |d, &(field, token, count)| {
                d.with_term(field, token, count)
            })
    }

    #[test]
    fn test_write_accumulates_terms() {
        let mut builder = TermBuilder::new(4, 1);
        builder
            .write(&doc(2, &[("title", "rain", 1), ("title", "check", 1)]))
            .unwrap();
        builder
            .write(&doc(1, &[("title", "rain", 2), ("body", "rain", 1)]))
            .unwrap();

        assert_eq!(builder.doc_count(), 2);
        assert_eq!(builder.term_count(), 3);
        assert!(builder.contains(1));
        assert!(!builder.contains(3));
    }

    #[test]
    fn test_duplicate_document_rejected() {
        let mut builder = TermBuilder::new(4, 1);
        builder.write(&doc(1, &[("title", "rain", 1)])).unwrap();
        let err = builder.write(&doc(1, &[("title", "man", 1)])).unwrap_err();
        assert!(matches!(err, TriedexError::InvalidRequest(_)));
        assert_eq!(builder.term_count(), 1);
    }

    #[test]
    fn test_finish_sorts_postings_and_sets_addresses() {
        let mut builder = TermBuilder::new(4, 1);
        builder.write(&doc(9, &[("title", "rain", 1)])).unwrap();
        builder.write(&doc(3, &[("title", "rain", 4)])).unwrap();

        let mut writer = PostingsWriter::new(Vec::new());
        let built = builder.finish(&mut writer).unwrap();
        assert_eq!(built.term_count, 1);
        assert_eq!(builder.doc_count(), 2);
        assert_eq!(built.documents.iter().collect::<Vec<_>>(), vec![3, 9]);

        let (field, tries) = &built.fields[0];
        assert_eq!(field, "title");
        let records = tries[bucket_of("rain", 1, 4)].preorder();
        let address = records.last().unwrap().address.unwrap();

        let mut reader = PostingsReader::new(Cursor::new(writer.finish().unwrap())).unwrap();
        assert_eq!(
            reader.read(address).unwrap(),
            vec![Posting::new(3, 4), Posting::new(9, 1)]
        );
    }
}
