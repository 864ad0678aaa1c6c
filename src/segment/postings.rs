//! Postings store
//!
//! An append-only file of postings records. Each record is
//! `[crc32 of body][body]` where the body is the posting count followed by
//! (document-id delta, term frequency) pairs, all variable-byte encoded.
//! Records are addressed by the `BlockAddress` kept on trie leaves.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crc32fast::Hasher;

use super::types::Posting;
use crate::error::TriedexError;
use crate::trie::BlockAddress;
use crate::Result;

const CHECKSUM_SIZE: usize = 4;

/// Variable-byte encoding for integers (commonly used in search engines)
pub fn encode_vbyte(value: u32, output: &mut Vec<u8>) {
    let mut v = value;
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            output.push(byte | 0x80); // Set high bit to indicate last byte
            break;
        } else {
            output.push(byte);
        }
    }
}

/// Decode a variable-byte encoded integer
pub fn decode_vbyte(input: &[u8], pos: &mut usize) -> Result<u32> {
    let mut result: u32 = 0;
    let mut shift = 0;

    loop {
        let byte = *input
            .get(*pos)
            .ok_or_else(|| TriedexError::corrupt("unexpected end of vbyte"))?;
        *pos += 1;

        // The fifth byte only has room for the top four bits of a u32
        if shift == 28 && byte & 0x70 != 0 {
            return Err(TriedexError::corrupt("vbyte value overflows u32"));
        }
        result |= ((byte & 0x7F) as u32) << shift;

        if byte & 0x80 != 0 {
            return Ok(result);
        }

        shift += 7;
        if shift > 28 {
            return Err(TriedexError::corrupt("vbyte value too large"));
        }
    }
}

/// Encode a postings list sorted by ascending document id
pub fn encode_postings(postings: &[Posting]) -> Result<Vec<u8>> {
    let mut body = Vec::with_capacity(postings.len() * 2 + 1);
    encode_vbyte(postings.len() as u32, &mut body);

    let mut previous: Option<u32> = None;
    for posting in postings {
        let delta = match previous {
            Some(prev) if posting.document_id <= prev => {
                return Err(TriedexError::Internal(format!(
                    "postings out of order: document {} after {}",
                    posting.document_id, prev
                )));
            }
            Some(prev) => posting.document_id - prev,
            None => posting.document_id,
        };
        encode_vbyte(delta, &mut body);
        encode_vbyte(posting.term_frequency, &mut body);
        previous = Some(posting.document_id);
    }

    Ok(body)
}

/// Decode a postings body produced by `encode_postings`
pub fn decode_postings(body: &[u8]) -> Result<Vec<Posting>> {
    let mut pos = 0;
    let count = decode_vbyte(body, &mut pos)? as usize;
    // Every posting takes at least two bytes
    if count > body.len() / 2 {
        return Err(TriedexError::corrupt(format!(
            "postings count {} does not fit in {} bytes",
            count,
            body.len()
        )));
    }

    let mut postings = Vec::with_capacity(count);
    let mut document_id = 0u32;
    for i in 0..count {
        let delta = decode_vbyte(body, &mut pos)?;
        if i > 0 && delta == 0 {
            return Err(TriedexError::corrupt("postings document ids are not increasing"));
        }
        document_id = document_id
            .checked_add(delta)
            .ok_or_else(|| TriedexError::corrupt("postings document id overflow"))?;
        let term_frequency = decode_vbyte(body, &mut pos)?;
        postings.push(Posting::new(document_id, term_frequency));
    }

    if pos != body.len() {
        return Err(TriedexError::corrupt(format!(
            "{} trailing bytes after postings",
            body.len() - pos
        )));
    }
    Ok(postings)
}

fn checksum(body: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(body);
    hasher.finalize()
}

/// Appends postings records and hands out their addresses
pub struct PostingsWriter<W: Write> {
    out: W,
    position: u64,
}

impl<W: Write> PostingsWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, position: 0 }
    }

    /// Append one term's postings and return where they were written
    pub fn append(&mut self, postings: &[Posting]) -> Result<BlockAddress> {
        let body = encode_postings(postings)?;
        let crc32 = checksum(&body);

        self.out.write_all(&crc32.to_le_bytes())?;
        self.out.write_all(&body)?;

        let length = (CHECKSUM_SIZE + body.len()) as u32;
        let address = BlockAddress::new(self.position, length);
        self.position += length as u64;
        Ok(address)
    }

    /// Bytes written so far
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Reads postings records by address
pub struct PostingsReader<R> {
    inner: R,
    len: u64,
}

impl PostingsReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> PostingsReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self { inner, len })
    }

    /// Read and verify one postings record
    pub fn read(&mut self, address: BlockAddress) -> Result<Vec<Posting>> {
        if address.end() > self.len || (address.length as usize) < CHECKSUM_SIZE {
            return Err(TriedexError::corrupt(format!(
                "postings record at {} (length {}) lies outside a {} byte store",
                address.position, address.length, self.len
            )));
        }

        self.inner.seek(SeekFrom::Start(address.position))?;
        let mut record = vec![0u8; address.length as usize];
        self.inner.read_exact(&mut record)?;

        let (crc_bytes, body) = record.split_at(CHECKSUM_SIZE);
        let stored = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        if stored != checksum(body) {
            tracing::warn!("Postings checksum mismatch at offset {}", address.position);
            return Err(TriedexError::corrupt(format!(
                "postings checksum mismatch at offset {}",
                address.position
            )));
        }

        decode_postings(body)
    }

    /// Read several records, visiting the file in position order.
    ///
    /// Results come back in the order of `addresses`; a missing address
    /// yields an empty list.
    pub fn read_many(&mut self, addresses: &[Option<BlockAddress>]) -> Result<Vec<Vec<Posting>>> {
        let mut order: Vec<(usize, BlockAddress)> = addresses
            .iter()
            .enumerate()
            .filter_map(|(i, address)| address.map(|a| (i, a)))
            .collect();
        order.sort_by_key(|(_, address)| address.position);

        let mut lists = vec![Vec::new(); addresses.len()];
        for (i, address) in order {
            lists[i] = self.read(address)?;
        }
        Ok(lists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn postings(pairs: &[(u32, u32)]) -> Vec<Posting> {
        pairs.iter().map(|&(d, tf)| Posting::new(d, tf)).collect()
    }

    #[test]
    fn test_vbyte_encoding() {
        let mut buf = Vec::new();
        for value in [0, 127, 128, 16384, u32::MAX] {
            encode_vbyte(value, &mut buf);
        }
        let mut pos = 0;
        for value in [0, 127, 128, 16384, u32::MAX] {
            assert_eq!(decode_vbyte(&buf, &mut pos).unwrap(), value);
        }
        assert_eq!(pos, buf.len());
        assert!(decode_vbyte(&buf, &mut pos).unwrap_err().is_corruption());
    }

    #[test]
    fn test_vbyte_rejects_overflowing_fifth_byte() {
        // Four continuation bytes, then a terminator carrying bits past u32
        let buf = [0x7F, 0x7F, 0x7F, 0x7F, 0x80 | 0x1F];
        let mut pos = 0;
        assert!(decode_vbyte(&buf, &mut pos).unwrap_err().is_corruption());

        let buf = [0x7F, 0x7F, 0x7F, 0x7F, 0x80 | 0x0F];
        let mut pos = 0;
        assert_eq!(decode_vbyte(&buf, &mut pos).unwrap(), u32::MAX);
    }

    #[test]
    fn test_encode_rejects_unsorted() {
        let err = encode_postings(&postings(&[(5, 1), (5, 2)])).unwrap_err();
        assert!(matches!(err, TriedexError::Internal(_)));
    }

    #[test]
    fn test_write_and_read() {
        let mut writer = PostingsWriter::new(Vec::new());
        let a = writer.append(&postings(&[(1, 2), (3, 1), (900, 7)])).unwrap();
        let b = writer.append(&postings(&[(0, 1)])).unwrap();
        let c = writer.append(&[]).unwrap();
        assert_eq!(a.position, 0);
        assert_eq!(b.position, a.end());
        assert_eq!(writer.position(), c.end());

        let bytes = writer.finish().unwrap();
        let mut reader = PostingsReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.read(a).unwrap(), postings(&[(1, 2), (3, 1), (900, 7)]));
        assert_eq!(reader.read(b).unwrap(), postings(&[(0, 1)]));
        assert!(reader.read(c).unwrap().is_empty());
    }

    #[test]
    fn test_read_many_keeps_input_order() {
        let mut writer = PostingsWriter::new(Vec::new());
        let a = writer.append(&postings(&[(1, 1)])).unwrap();
        let b = writer.append(&postings(&[(2, 1)])).unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = PostingsReader::new(Cursor::new(bytes)).unwrap();
        let lists = reader.read_many(&[Some(b), None, Some(a)]).unwrap();
        assert_eq!(lists[0], postings(&[(2, 1)]));
        assert!(lists[1].is_empty());
        assert_eq!(lists[2], postings(&[(1, 1)]));
    }

    #[test]
    fn test_corrupt_records() {
        let mut writer = PostingsWriter::new(Vec::new());
        let a = writer.append(&postings(&[(1, 1), (4, 2)])).unwrap();
        let mut bytes = writer.finish().unwrap();

        let mut reader = PostingsReader::new(Cursor::new(bytes.clone())).unwrap();
        let past_end = BlockAddress::new(a.position, a.length + 1);
        assert!(reader.read(past_end).unwrap_err().is_corruption());

        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let mut reader = PostingsReader::new(Cursor::new(bytes)).unwrap();
        assert!(reader.read(a).unwrap_err().is_corruption());
    }
}
