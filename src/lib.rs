pub mod core;
pub mod storage;
pub mod analysis;
pub mod schema;
pub mod index;
pub mod scoring;
pub mod search;
pub mod query;
pub mod mvcc;
pub mod writer;
pub mod reader;
pub mod compression;
pub mod parallel;

pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::index::Index;
pub use crate::core::types::{DocId, Document, FieldValue, Fingerprint};
pub use crate::schema::schema::Schema;
pub use crate::search::results::{ScoredDocument, SearchResults};

/*
┌──────────────────────────────────── LUMENDEX ARCHITECTURE ───────────────────────────────────┐

  caller ──► Index (core::index)
              │
              ├─ needs_reindex ──► FreshnessOracle ──► IndexReader::document_by_key
              │
              ├─ writer() ──► IndexWriter ─────────────────────────────────────────┐
              │                • FileLock (write.lock, flock)                      │
              │                • WriteBatch: last op per key wins                  │
              │                • ParallelIndexer: analyze (rayon) + InvertedIndex  │
              │                • SegmentWriter: header + compressed bincode body   │
              │                • TieredMergePolicy + SegmentMerger                 │
              │                • Manifest::save (temp file + atomic rename)        │
              │                                                                    ▼
              │                                                     <dir>/MANIFEST
              │                                                     <dir>/segments/<uuid>.seg
              │                                                                    │
              └─ reader() ──► MVCCController::snapshot ◄──────────────────────────┘
                               • LRU of decoded SegmentReaders (fst term dictionary,
                                 posting record arena, positions, field lengths)
                               • Snapshot: segments + deletion bitmaps + global DocIds
                               │
                               ▼
                          IndexReader ──► QueryBuilder ──► QueryParser (Lexer)
                               │              Query { Term | Phrase | Bool | Prefix | Fuzzy }
                               ▼
                          QueryExecutor ──► Scorer (BM25 / TF-IDF) ──► TopKCollector
                               │
                               ▼
                          SearchResults { total_hits, max_score, hits }

└──────────────────────────────────────────────────────────────────────────────────────────────┘
*/
