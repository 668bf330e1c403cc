use std::sync::Arc;
use roaring::RoaringBitmap;
use crate::core::error::Result;
use crate::index::inverted::InvertedIndex;
use crate::storage::segment::SegmentData;
use crate::storage::segment_reader::SegmentReader;

/// Folds several segments into one, dropping deleted documents.
///
/// Live documents keep their relative order: all of the first segment, then
/// the second, and so on. Terms whose every posting was deleted disappear
/// from the merged dictionary.
pub struct SegmentMerger;

impl SegmentMerger {
    pub fn merge(segments: &[(Arc<SegmentReader>, RoaringBitmap)]) -> Result<SegmentData> {
        let mut index = InvertedIndex::new();
        let mut remaps = Vec::with_capacity(segments.len());

        for (reader, deleted) in segments {
            let mut remap = vec![None; reader.doc_count() as usize];
            for local in 0..reader.doc_count() {
                if deleted.contains(local) {
                    continue;
                }
                let Some(doc) = reader.document(local) else {
                    continue;
                };
                let lengths = reader.field_lengths()
                    .map(|(field, column)| (field.to_string(), column[local as usize]))
                    .collect();
                remap[local as usize] = Some(index.append_document(doc.clone(), lengths));
            }
            remaps.push(remap);
        }

        for ((reader, _), remap) in segments.iter().zip(&remaps) {
            for (term, ordinal) in reader.terms()? {
                for record in reader.postings(ordinal) {
                    if let Some(doc) = remap[record.doc as usize] {
                        index.add_posting(term.clone(), doc, reader.positions(record).to_vec());
                    }
                }
            }
        }

        index.build()
    }
}
