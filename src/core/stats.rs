use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// One live segment as the manifest records it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub name: String,          // File name inside segments/
    pub size_bytes: u64,
    pub doc_count: u32,
    pub deleted_docs: u32,
}

/// Any file found in the index directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,          // Path relative to the index directory
    pub size_bytes: u64,
}

/// Index statistics for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub generation: u64,
    pub committed_at: Option<DateTime<Utc>>,

    // Storage metrics
    pub segment_count: usize,
    pub total_documents: u64,
    pub deleted_documents: u64,
    pub index_size_bytes: u64,
}

impl IndexStats {
    pub fn from_segments(
        generation: u64,
        committed_at: Option<DateTime<Utc>>,
        segments: &[SegmentInfo],
    ) -> Self {
        IndexStats {
            generation,
            committed_at,
            segment_count: segments.len(),
            total_documents: segments.iter().map(|s| (s.doc_count - s.deleted_docs) as u64).sum(),
            deleted_documents: segments.iter().map(|s| s.deleted_docs as u64).sum(),
            index_size_bytes: segments.iter().map(|s| s.size_bytes).sum(),
        }
    }

    /// Share of stored documents that are tombstoned
    pub fn deleted_ratio(&self) -> f32 {
        let stored = self.total_documents + self.deleted_documents;
        if stored == 0 {
            return 0.0;
        }
        self.deleted_documents as f32 / stored as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(name: &str, docs: u32, deleted: u32, size: u64) -> SegmentInfo {
        SegmentInfo {
            name: name.to_string(),
            size_bytes: size,
            doc_count: docs,
            deleted_docs: deleted,
        }
    }

    #[test]
    fn test_stats_sum_segments() {
        let stats = IndexStats::from_segments(3, None, &[
            segment("a.seg", 10, 2, 100),
            segment("b.seg", 5, 0, 40),
        ]);
        assert_eq!(stats.segment_count, 2);
        assert_eq!(stats.total_documents, 13);
        assert_eq!(stats.deleted_documents, 2);
        assert_eq!(stats.index_size_bytes, 140);
        assert!((stats.deleted_ratio() - 2.0 / 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_stats() {
        let stats = IndexStats::from_segments(0, None, &[]);
        assert_eq!(stats.total_documents, 0);
        assert_eq!(stats.deleted_ratio(), 0.0);
    }
}
