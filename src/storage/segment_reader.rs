use std::fs;
use fst::{IntoStreamer, Map, Streamer};
use crate::compression::compress::CompressedBlock;
use crate::core::error::{Error, Result};
use crate::core::types::Document;
use crate::index::inverted::Term;
use crate::index::posting::PostingRecord;
use crate::storage::layout::StorageLayout;
use crate::storage::segment::{SegmentData, SegmentHeader, SegmentMeta};

/// A fully decoded, verified segment. Immutable once opened, so it is shared
/// between snapshots behind an `Arc`.
pub struct SegmentReader {
    pub meta: SegmentMeta,
    pub header: SegmentHeader,
    dictionary: Map<Vec<u8>>,
    data: SegmentData,
}

impl SegmentReader {
    /// Read and verify a segment. A missing file surfaces as an `Io` error;
    /// anything malformed is `StoreCorruption`.
    pub fn open(storage: &StorageLayout, meta: &SegmentMeta) -> Result<Self> {
        let bytes = fs::read(storage.segment_path(&meta.id))?;
        Self::from_bytes(meta.clone(), &bytes)
    }

    pub fn from_bytes(meta: SegmentMeta, bytes: &[u8]) -> Result<Self> {
        let header = SegmentHeader::decode(bytes)?;
        let body = &bytes[SegmentHeader::SIZE..];

        if body.len() as u64 != header.body_len {
            return Err(Error::corruption(format!(
                "segment {} body is {} bytes, header says {}", meta.id, body.len(), header.body_len
            )));
        }
        if crc32fast::hash(body) != header.checksum {
            return Err(Error::corruption(format!("segment {} checksum mismatch", meta.id)));
        }

        let original_size = usize::try_from(header.raw_len)
            .map_err(|_| Error::corruption(format!("segment {} raw length {} is too large", meta.id, header.raw_len)))?;
        let block = CompressedBlock {
            data: body.to_vec(),
            original_size,
            compression: header.compression,
        };
        let mut data: SegmentData = bincode::deserialize(&block.decompress()?)?;
        data.validate()?;

        if data.doc_count() != meta.doc_count {
            return Err(Error::corruption(format!(
                "segment {} holds {} documents, manifest says {}", meta.id, data.doc_count(), meta.doc_count
            )));
        }

        let dictionary = Map::new(std::mem::take(&mut data.term_dict))?;
        if dictionary.len() != data.term_postings.len() {
            return Err(Error::corruption("term dictionary and posting table disagree"));
        }

        Ok(SegmentReader {
            meta,
            header,
            dictionary,
            data,
        })
    }

    pub fn doc_count(&self) -> u32 {
        self.data.doc_count()
    }

    pub fn dictionary(&self) -> &Map<Vec<u8>> {
        &self.dictionary
    }

    pub fn term_ordinal(&self, term: &Term) -> Option<u32> {
        self.dictionary.get(term.key()).map(|ord| ord as u32)
    }

    pub fn postings(&self, ordinal: u32) -> &[PostingRecord] {
        match self.data.term_postings.get(ordinal as usize) {
            Some(&(start, len)) => &self.data.postings[start as usize..(start + len) as usize],
            None => &[],
        }
    }

    pub fn term_postings(&self, term: &Term) -> &[PostingRecord] {
        self.term_ordinal(term)
            .map(|ord| self.postings(ord))
            .unwrap_or(&[])
    }

    pub fn positions(&self, record: &PostingRecord) -> &[u32] {
        let start = record.positions_start as usize;
        &self.data.positions[start..start + record.term_freq as usize]
    }

    pub fn document(&self, doc: u32) -> Option<&Document> {
        self.data.documents.get(doc as usize)
    }

    pub fn field_length(&self, field: &str, doc: u32) -> u32 {
        self.data.field_lengths
            .get(field)
            .and_then(|column| column.get(doc as usize))
            .copied()
            .unwrap_or(0)
    }

    pub fn field_lengths(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.data.field_lengths.iter().map(|(f, c)| (f.as_str(), c.as_slice()))
    }

    /// Every term in dictionary order with its ordinal
    pub fn terms(&self) -> Result<Vec<(Term, u32)>> {
        let mut terms = Vec::with_capacity(self.dictionary.len());
        let mut stream = self.dictionary.stream().into_stream();
        while let Some((key, ordinal)) = stream.next() {
            terms.push((Term::from_key(key)?, ordinal as u32));
        }
        Ok(terms)
    }
}
