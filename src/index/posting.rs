use serde::{Serialize, Deserialize};
use crate::core::types::DocId;

/// Fixed-size entry in a segment's posting arena. The positions of the
/// occurrence live in the segment's positions arena at
/// `positions_start .. positions_start + term_freq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRecord {
    pub doc: u32,              // Segment-local document ordinal
    pub term_freq: u32,
    pub positions_start: u32,
}

/// Resolved posting: one live document containing a term
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_freq: u32,       // Term frequency in document
    pub positions: Vec<u32>,  // Token positions for phrase queries
    pub field_length: u32,    // Tokens in the field, for length normalization
}

/// Posting list for a term, sorted by doc_id
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    pub postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        PostingList {
            postings: Vec::new(),
        }
    }

    pub fn add_posting(&mut self, posting: Posting) {
        match self.postings.binary_search_by_key(&posting.doc_id, |p| p.doc_id) {
            Ok(pos) => self.postings[pos] = posting,
            Err(pos) => self.postings.insert(pos, posting),
        }
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }

    pub fn get(&self, doc_id: DocId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|pos| &self.postings[pos])
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.postings.iter().map(|p| p.doc_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(doc: u32, positions: &[u32]) -> Posting {
        Posting {
            doc_id: DocId(doc),
            term_freq: positions.len() as u32,
            positions: positions.to_vec(),
            field_length: 10,
        }
    }

    #[test]
    fn test_add_keeps_order() {
        let mut list = PostingList::new();
        list.add_posting(posting(5, &[0]));
        list.add_posting(posting(1, &[2, 4]));
        list.add_posting(posting(3, &[1]));
        let docs: Vec<u32> = list.doc_ids().map(|d| d.0).collect();
        assert_eq!(docs, vec![1, 3, 5]);
        assert_eq!(list.get(DocId(1)).unwrap().positions, vec![2, 4]);
        assert!(list.get(DocId(2)).is_none());
    }
}
