use std::fs;
use std::io::Write;
use chrono::{DateTime, Utc};
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;
use crate::core::error::{Error, ErrorKind, Result};
use crate::schema::schema::Schema;
use crate::storage::layout::StorageLayout;
use crate::storage::segment::{SegmentId, SegmentMeta};

const MANIFEST_MAGIC: [u8; 4] = *b"LMFT";
const MANIFEST_VERSION: u32 = 1;

/// A segment as seen by one commit: the immutable file plus the set of its
/// documents deleted so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSegment {
    pub meta: SegmentMeta,
    deletes: Vec<u8>,   // serialized RoaringBitmap, empty when nothing is deleted
}

impl ManifestSegment {
    pub fn new(meta: SegmentMeta) -> Self {
        ManifestSegment {
            meta,
            deletes: Vec::new(),
        }
    }

    pub fn id(&self) -> SegmentId {
        self.meta.id
    }

    pub fn deleted_docs(&self) -> Result<RoaringBitmap> {
        if self.deletes.is_empty() {
            return Ok(RoaringBitmap::new());
        }
        RoaringBitmap::deserialize_from(&self.deletes[..])
            .map_err(|e| Error::corruption(format!("delete set of segment {}: {}", self.meta.id, e)))
    }

    pub fn set_deleted_docs(&mut self, deleted: &RoaringBitmap) -> Result<()> {
        self.deletes.clear();
        if !deleted.is_empty() {
            deleted.serialize_into(&mut self.deletes)?;
        }
        Ok(())
    }

    pub fn live_count(&self) -> Result<u32> {
        let deleted = self.deleted_docs()?.len() as u32;
        Ok(self.meta.doc_count.saturating_sub(deleted))
    }
}

/// The commit point. Readers see exactly the segments listed by the manifest
/// they loaded; a commit becomes visible when the file is atomically replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub generation: u64,
    pub schema: Schema,
    pub segments: Vec<ManifestSegment>,
    pub committed_at: DateTime<Utc>,
}

impl Manifest {
    pub fn new(schema: Schema) -> Self {
        Manifest {
            generation: 0,
            schema,
            segments: Vec::new(),
            committed_at: Utc::now(),
        }
    }

    pub fn segment_ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.segments.iter().map(|s| s.id())
    }

    pub fn contains(&self, id: &SegmentId) -> bool {
        self.segments.iter().any(|s| s.id() == *id)
    }

    /// Load the current manifest. `Ok(None)` means no index exists yet.
    pub fn load(storage: &StorageLayout) -> Result<Option<Self>> {
        let bytes = match fs::read(storage.manifest_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::decode(&bytes).map(Some)
    }

    /// Atomically replace the manifest: write a temp file in the same
    /// directory, fsync it, then rename over the old one. Once the rename
    /// succeeds the commit has happened and `Ok` is returned.
    pub fn save(&self, storage: &StorageLayout) -> Result<()> {
        let bytes = self.encode()?;

        let mut temp = NamedTempFile::new_in(storage.base_dir())?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(storage.manifest_path())?;

        #[cfg(unix)]
        if let Err(e) = fs::File::open(storage.base_dir()).and_then(|dir| dir.sync_all()) {
            warn!(error = %e, "manifest renamed but directory fsync failed");
        }

        Ok(())
    }

    /// ```text
    /// magic[4] version[4] crc32[4] body
    /// ```
    fn encode(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)
            .map_err(|e| Error::new(ErrorKind::Internal, format!("manifest encode failed: {}", e)))?;

        let mut bytes = Vec::with_capacity(12 + body.len());
        bytes.extend_from_slice(&MANIFEST_MAGIC);
        bytes.extend_from_slice(&MANIFEST_VERSION.to_le_bytes());
        bytes.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 12 || bytes[0..4] != MANIFEST_MAGIC {
            return Err(Error::corruption("manifest header is invalid"));
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != MANIFEST_VERSION {
            return Err(Error::corruption(format!("unsupported manifest version {}", version)));
        }
        let checksum = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let body = &bytes[12..];
        if crc32fast::hash(body) != checksum {
            return Err(Error::corruption("manifest checksum mismatch"));
        }
        Ok(bincode::deserialize(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn meta(doc_count: u32) -> SegmentMeta {
        SegmentMeta {
            id: SegmentId::new(),
            doc_count,
            size_bytes: 100,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_manifest_is_none() {
        let dir = tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf());
        assert!(Manifest::load(&storage).unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf());
        storage.create_dirs().unwrap();

        let mut manifest = Manifest::new(Schema::file_index());
        manifest.generation = 3;
        let mut segment = ManifestSegment::new(meta(10));
        let mut deleted = RoaringBitmap::new();
        deleted.insert(4);
        deleted.insert(7);
        segment.set_deleted_docs(&deleted).unwrap();
        manifest.segments.push(segment);
        manifest.save(&storage).unwrap();

        let loaded = Manifest::load(&storage).unwrap().unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.segments[0].deleted_docs().unwrap(), deleted);
        assert_eq!(loaded.segments[0].live_count().unwrap(), 8);

        // replacing leaves no temp files behind
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| n == "MANIFEST" || n == "segments"));
    }

    #[test]
    fn test_damaged_manifest_is_corruption() {
        let dir = tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf());
        storage.create_dirs().unwrap();
        Manifest::new(Schema::file_index()).save(&storage).unwrap();

        let mut bytes = fs::read(storage.manifest_path()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x55;
        fs::write(storage.manifest_path(), bytes).unwrap();

        let err = Manifest::load(&storage).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StoreCorruption);
    }
}
