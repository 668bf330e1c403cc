use std::collections::BTreeMap;
use std::fmt;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use serde::{Deserialize, Serialize};
use crate::compression::compress::CompressionType;
use crate::core::error::{Error, Result};
use crate::core::types::Document;
use crate::index::posting::PostingRecord;
use crate::storage::layout::SEGMENT_EXTENSION;

/// Unique segment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(SegmentId)
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, SEGMENT_EXTENSION)
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the manifest records about a segment file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub id: SegmentId,
    pub doc_count: u32,      // Documents written, deleted or not
    pub size_bytes: u64,     // File size on disk
    pub created_at: DateTime<Utc>,
}

/// Segment file header
///
/// ```text
/// magic[4] version[4] compression[1] pad[3] checksum[4] body_len[8] raw_len[8]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub version: u32,      // Format version
    pub compression: CompressionType,
    pub checksum: u32,     // CRC32 of the body as stored
    pub body_len: u64,     // Stored (compressed) body length
    pub raw_len: u64,      // Body length after decompression
}

impl SegmentHeader {
    pub const MAGIC: [u8; 4] = *b"LMDX";
    pub const VERSION: u32 = 1;
    pub const SIZE: usize = 32; // Fixed header size

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&Self::MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8] = self.compression.code();
        buf[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        buf[16..24].copy_from_slice(&self.body_len.to_le_bytes());
        buf[24..32].copy_from_slice(&self.raw_len.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::corruption("segment shorter than its header"));
        }
        if buf[0..4] != Self::MAGIC {
            return Err(Error::corruption("bad segment magic"));
        }

        let u32_at = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        let u64_at = |at: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buf[at..at + 8]);
            u64::from_le_bytes(bytes)
        };

        let version = u32_at(4);
        if version != Self::VERSION {
            return Err(Error::corruption(format!("unsupported segment version {}", version)));
        }

        Ok(SegmentHeader {
            version,
            compression: CompressionType::from_code(buf[8])?,
            checksum: u32_at(12),
            body_len: u64_at(16),
            raw_len: u64_at(24),
        })
    }
}

/// Decoded segment body.
///
/// `term_dict` maps `field \0 token` to a term ordinal; `term_postings[ord]`
/// is the `(start, len)` slice of `postings` for that term, sorted by
/// document. Field lengths are columns indexed by local document ordinal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentData {
    pub documents: Vec<Document>,
    pub term_dict: Vec<u8>,
    pub term_postings: Vec<(u32, u32)>,
    pub postings: Vec<PostingRecord>,
    pub positions: Vec<u32>,
    pub field_lengths: BTreeMap<String, Vec<u32>>,
}

impl SegmentData {
    pub fn doc_count(&self) -> u32 {
        self.documents.len() as u32
    }

    /// Structural checks on arena bounds and column sizes
    pub fn validate(&self) -> Result<()> {
        let doc_count = self.documents.len();
        for &(start, len) in &self.term_postings {
            if start as usize + len as usize > self.postings.len() {
                return Err(Error::corruption("posting range out of bounds"));
            }
        }
        for record in &self.postings {
            if record.doc as usize >= doc_count {
                return Err(Error::corruption("posting references unknown document"));
            }
            if record.positions_start as usize + record.term_freq as usize > self.positions.len() {
                return Err(Error::corruption("positions range out of bounds"));
            }
        }
        for (field, column) in &self.field_lengths {
            if column.len() != doc_count {
                return Err(Error::corruption(format!("length column '{}' has wrong size", field)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encoding() {
        let header = SegmentHeader {
            version: SegmentHeader::VERSION,
            compression: CompressionType::Zstd,
            checksum: 0xdead_beef,
            body_len: 1234,
            raw_len: 5678,
        };
        assert_eq!(SegmentHeader::decode(&header.encode()).unwrap(), header);
    }

    #[test]
    fn test_header_rejects_garbage() {
        assert!(SegmentHeader::decode(b"short").is_err());
        assert!(SegmentHeader::decode(&[0u8; SegmentHeader::SIZE]).is_err());
    }

    #[test]
    fn test_segment_id_file_name() {
        let id = SegmentId::new();
        let name = id.file_name();
        assert!(name.ends_with(".seg"));
        assert_eq!(SegmentId::parse(name.trim_end_matches(".seg")), Some(id));
    }
}
