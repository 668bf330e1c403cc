use std::collections::BinaryHeap;
use std::cmp::Ordering;
use crate::core::types::{DocId, Document};

/// Search results container
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub hits: Vec<ScoredDocument>,
    pub total_hits: usize,   // All matches, not just the returned page
    pub max_score: f32,
}

/// Document with relevance score
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub doc_id: DocId,
    pub score: f32,
    pub document: Option<Document>,  // Stored fields, filled in by the reader
}

impl ScoredDocument {
    pub fn new(doc_id: DocId, score: f32) -> Self {
        ScoredDocument {
            doc_id,
            score,
            document: None,
        }
    }

    /// Result order: higher score first, then lower DocId
    fn rank(&self, other: &Self) -> Ordering {
        other.score
            .total_cmp(&self.score)
            .then(self.doc_id.cmp(&other.doc_id))
    }
}

// Ordered so that the heap's maximum is the worst-ranked hit
impl PartialEq for ScoredDocument {
    fn eq(&self, other: &Self) -> bool {
        self.rank(other) == Ordering::Equal
    }
}

impl Eq for ScoredDocument {}

impl PartialOrd for ScoredDocument {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDocument {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank(other)
    }
}

/// Top-K collector for efficient result collection
pub struct TopKCollector {
    pub heap: BinaryHeap<ScoredDocument>,
    pub k: usize,
    pub total_collected: usize,  // Track total documents processed
}

impl TopKCollector {
    pub fn new(k: usize) -> Self {
        TopKCollector {
            heap: BinaryHeap::with_capacity(k + 1),
            k,
            total_collected: 0,
        }
    }

    pub fn collect(&mut self, scored_doc: ScoredDocument) {
        self.total_collected += 1;
        if self.k == 0 {
            return;
        }

        if self.heap.len() < self.k {
            self.heap.push(scored_doc);
        } else if let Some(worst) = self.heap.peek() {
            if scored_doc < *worst {
                self.heap.pop();
                self.heap.push(scored_doc);
            }
        }
    }

    pub fn into_results(self) -> SearchResults {
        let hits = self.heap.into_sorted_vec();
        SearchResults {
            max_score: hits.first().map(|h| h.score).unwrap_or(0.0),
            total_hits: self.total_collected,
            hits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_best_k() {
        let mut collector = TopKCollector::new(2);
        for (doc, score) in [(0, 1.0), (1, 3.0), (2, 2.0), (3, 0.5)] {
            collector.collect(ScoredDocument::new(DocId(doc), score));
        }
        let results = collector.into_results();
        assert_eq!(results.total_hits, 4);
        let docs: Vec<u32> = results.hits.iter().map(|h| h.doc_id.0).collect();
        assert_eq!(docs, vec![1, 2]);
        assert_eq!(results.max_score, 3.0);
    }

    #[test]
    fn test_ties_break_by_doc_id() {
        let mut collector = TopKCollector::new(3);
        for doc in [7, 2, 9, 4] {
            collector.collect(ScoredDocument::new(DocId(doc), 1.0));
        }
        let docs: Vec<u32> = collector.into_results().hits.iter().map(|h| h.doc_id.0).collect();
        assert_eq!(docs, vec![2, 4, 7]);
    }

    #[test]
    fn test_zero_k_still_counts() {
        let mut collector = TopKCollector::new(0);
        collector.collect(ScoredDocument::new(DocId(1), 1.0));
        let results = collector.into_results();
        assert!(results.hits.is_empty());
        assert_eq!(results.total_hits, 1);
    }
}
