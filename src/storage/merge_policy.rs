use crate::storage::segment::{SegmentId, SegmentMeta};

/// Policy for deciding when and how to merge segments
pub trait MergePolicy: Send + Sync {
    /// Check if segments should be merged
    fn should_merge(&self, segments: &[SegmentMeta]) -> bool;

    /// Select segments to merge
    fn select_segments_to_merge(&self, segments: &[SegmentMeta]) -> Vec<SegmentId>;
}

/// Keeps the segment count bounded by folding the smallest segments together
pub struct TieredMergePolicy {
    pub max_segments: usize,
    pub merge_factor: usize,
}

impl TieredMergePolicy {
    pub fn new(max_segments: usize, merge_factor: usize) -> Self {
        TieredMergePolicy {
            max_segments: max_segments.max(1),
            merge_factor: merge_factor.max(2),
        }
    }
}

impl Default for TieredMergePolicy {
    fn default() -> Self {
        TieredMergePolicy::new(8, 4)
    }
}

impl MergePolicy for TieredMergePolicy {
    fn should_merge(&self, segments: &[SegmentMeta]) -> bool {
        segments.len() > self.max_segments
    }

    fn select_segments_to_merge(&self, segments: &[SegmentMeta]) -> Vec<SegmentId> {
        if segments.len() < 2 {
            return Vec::new();
        }

        // Smallest first; ties by age so the choice is deterministic
        let mut sorted: Vec<&SegmentMeta> = segments.iter().collect();
        sorted.sort_by(|a, b| {
            a.size_bytes.cmp(&b.size_bytes)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });

        sorted.into_iter()
            .take(self.merge_factor)
            .map(|s| s.id)
            .collect()
    }
}
