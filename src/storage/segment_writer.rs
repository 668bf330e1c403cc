use std::io::{Write, Seek, SeekFrom};
use std::fs::File;
use chrono::Utc;
use crc32fast::Hasher;
use tracing::debug;
use crate::compression::compress::{CompressedBlock, CompressionType};
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::layout::StorageLayout;
use crate::storage::segment::{SegmentData, SegmentHeader, SegmentId, SegmentMeta};

/// Writes one immutable segment file.
///
/// ```text
/// [ HEADER (magic, version, compression, checksum, lengths) ] <- byte 0
/// [ BODY   (bincode SegmentData, compressed)                ]
/// ```
pub struct SegmentWriter {
    pub segment_id: SegmentId,
    pub file: File,
    pub hasher: Hasher,
    pub compression: CompressionType,
}

impl SegmentWriter {
    pub fn new(
        storage: &StorageLayout,
        segment_id: SegmentId,
        compression: CompressionType,
    ) -> Result<Self> {
        let path = storage.segment_path(&segment_id);
        let mut file = File::create(path)?;
        // Reserve the header; it is filled in by finish()
        file.write_all(&[0u8; SegmentHeader::SIZE])?;

        Ok(SegmentWriter {
            segment_id,
            file,
            hasher: Hasher::new(),
            compression,
        })
    }

    pub fn finish(mut self, data: &SegmentData) -> Result<SegmentMeta> {
        let raw = bincode::serialize(data)
            .map_err(|e| Error::new(ErrorKind::Internal, format!("segment encode failed: {}", e)))?;
        let block = CompressedBlock::compress(&raw, self.compression)?;

        self.hasher.update(&block.data);
        self.file.write_all(&block.data)?;

        let header = SegmentHeader {
            version: SegmentHeader::VERSION,
            compression: self.compression,
            checksum: self.hasher.finalize(),
            body_len: block.data.len() as u64,
            raw_len: raw.len() as u64,
        };
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.encode())?;
        self.file.sync_all()?;

        let size_bytes = self.file.metadata()?.len();
        debug!(segment = %self.segment_id, docs = data.doc_count(), size_bytes, "segment written");

        Ok(SegmentMeta {
            id: self.segment_id,
            doc_count: data.doc_count(),
            size_bytes,
            created_at: Utc::now(),
        })
    }
}
