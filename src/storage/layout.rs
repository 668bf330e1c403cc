use std::path::{Path, PathBuf};
use std::fs;
use crate::core::error::Result;
use crate::storage::segment::SegmentId;

pub const MANIFEST_FILE: &str = "MANIFEST";
pub const LOCK_FILE: &str = "write.lock";
pub const SEGMENT_EXTENSION: &str = "seg";

/// Directory structure for index files
///
/// ```text
/// <base>/MANIFEST            commit point, replaced atomically
/// <base>/write.lock          single-writer lock
/// <base>/segments/<id>.seg   immutable segments
/// ```
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,      // Root directory
    pub segments_dir: PathBuf,  // Segment files
}

impl StorageLayout {
    /// Does not touch the filesystem; see `create_dirs`.
    pub fn new(base_dir: PathBuf) -> Self {
        let segments_dir = base_dir.join("segments");
        StorageLayout {
            base_dir,
            segments_dir,
        }
    }

    pub fn create_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.segments_dir)?;
        Ok(())
    }

    pub fn segment_path(&self, id: &SegmentId) -> PathBuf {
        self.segments_dir.join(id.file_name())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.base_dir.join(MANIFEST_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(LOCK_FILE)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Segment ids for every `.seg` file on disk, referenced or not
    pub fn segment_files(&self) -> Result<Vec<SegmentId>> {
        if !self.segments_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.segments_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SEGMENT_EXTENSION) {
                continue;
            }
            if let Some(id) = path.file_stem().and_then(|s| s.to_str()).and_then(SegmentId::parse) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}
