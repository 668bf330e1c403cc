use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use roaring::RoaringBitmap;
use tracing::{debug, warn};
use crate::core::error::{ErrorKind, Result};
use crate::core::types::{DocId, Document};
use crate::index::inverted::Term;
use crate::index::posting::{Posting, PostingList};
use crate::search::fuzzy::FuzzyAutomaton;
use crate::search::prefix::prefix_terms;
use crate::storage::layout::StorageLayout;
use crate::storage::manifest::Manifest;
use crate::storage::segment::{SegmentId, SegmentMeta};
use crate::storage::segment_reader::SegmentReader;

/// Attempts at opening a snapshot when a segment disappears underneath us
/// because a concurrent commit merged it away.
const MAX_OPEN_RETRIES: usize = 3;

/// One segment within a snapshot. Global document ids of this segment are
/// `base .. base + doc_count`.
#[derive(Clone)]
pub struct SnapshotSegment {
    pub reader: Arc<SegmentReader>,
    pub deleted_docs: Arc<RoaringBitmap>,
    pub base: u32,
}

impl SnapshotSegment {
    pub fn is_live(&self, local: u32) -> bool {
        local < self.reader.doc_count() && !self.deleted_docs.contains(local)
    }

    fn global(&self, local: u32) -> DocId {
        DocId(self.base + local)
    }
}

/// Immutable view of one committed generation of the index
pub struct Snapshot {
    pub generation: u64,
    pub committed_at: Option<DateTime<Utc>>,
    pub segments: Vec<SnapshotSegment>,
    pub live_docs: u32,
    field_totals: HashMap<String, u64>,
}

impl Snapshot {
    /// View of an index that has never been committed
    pub fn empty() -> Self {
        Snapshot {
            generation: 0,
            committed_at: None,
            segments: Vec::new(),
            live_docs: 0,
            field_totals: HashMap::new(),
        }
    }

    fn build(manifest: &Manifest, readers: Vec<Arc<SegmentReader>>) -> Result<Self> {
        let mut segments = Vec::with_capacity(readers.len());
        let mut base = 0u32;
        let mut live_docs = 0u32;
        let mut field_totals: HashMap<String, u64> = HashMap::new();

        for (entry, reader) in manifest.segments.iter().zip(readers) {
            let deleted_docs = entry.deleted_docs()?;
            for (field, column) in reader.field_lengths() {
                let total: u64 = column.iter()
                    .enumerate()
                    .filter(|(doc, _)| !deleted_docs.contains(*doc as u32))
                    .map(|(_, len)| *len as u64)
                    .sum();
                *field_totals.entry(field.to_string()).or_default() += total;
            }

            let doc_count = reader.doc_count();
            live_docs += doc_count.saturating_sub(deleted_docs.len() as u32);
            segments.push(SnapshotSegment {
                reader,
                deleted_docs: Arc::new(deleted_docs),
                base,
            });
            base += doc_count;
        }

        Ok(Snapshot {
            generation: manifest.generation,
            committed_at: Some(manifest.committed_at),
            segments,
            live_docs,
            field_totals,
        })
    }

    fn is_current(&self, manifest: &Manifest) -> bool {
        self.generation == manifest.generation && self.committed_at == Some(manifest.committed_at)
    }

    pub fn num_docs(&self) -> u32 {
        self.live_docs
    }

    /// Map a global id to its segment and local ordinal
    pub fn resolve(&self, doc_id: DocId) -> Option<(&SnapshotSegment, u32)> {
        let idx = self.segments.partition_point(|s| s.base <= doc_id.0).checked_sub(1)?;
        let segment = &self.segments[idx];
        let local = doc_id.0 - segment.base;
        segment.is_live(local).then_some((segment, local))
    }

    /// Stored fields of a live document
    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        let (segment, local) = self.resolve(doc_id)?;
        segment.reader.document(local)
    }

    /// Full scan over live documents in id order
    pub fn documents(&self) -> impl Iterator<Item = (DocId, &Document)> + '_ {
        self.segments.iter().flat_map(|segment| {
            (0..segment.reader.doc_count())
                .filter(move |local| !segment.deleted_docs.contains(*local))
                .filter_map(move |local| {
                    segment.reader.document(local).map(|doc| (segment.global(local), doc))
                })
        })
    }

    /// Live postings of a term across all segments, ordered by DocId
    pub fn postings(&self, term: &Term) -> PostingList {
        let mut list = PostingList::new();
        for segment in &self.segments {
            for record in segment.reader.term_postings(term) {
                if segment.deleted_docs.contains(record.doc) {
                    continue;
                }
                list.postings.push(Posting {
                    doc_id: segment.global(record.doc),
                    term_freq: record.term_freq,
                    positions: segment.reader.positions(record).to_vec(),
                    field_length: segment.reader.field_length(&term.field, record.doc),
                });
            }
        }
        list
    }

    pub fn doc_freq(&self, term: &Term) -> u32 {
        self.segments.iter()
            .map(|segment| {
                segment.reader.term_postings(term)
                    .iter()
                    .filter(|r| !segment.deleted_docs.contains(r.doc))
                    .count() as u32
            })
            .sum()
    }

    /// Live document holding `value` in the keyed field
    pub fn lookup_key(&self, key_field: &str, value: &str) -> Option<DocId> {
        self.postings(&Term::new(key_field, value))
            .postings
            .first()
            .map(|p| p.doc_id)
    }

    pub fn avg_field_length(&self, field: &str) -> f32 {
        if self.live_docs == 0 {
            return 0.0;
        }
        let total = self.field_totals.get(field).copied().unwrap_or(0);
        total as f32 / self.live_docs as f32
    }

    /// Distinct terms of `field` starting with `prefix` that still occur in
    /// a live document, in term order
    pub fn expand_prefix(&self, field: &str, prefix: &str) -> Vec<String> {
        let mut terms = BTreeMap::new();
        for segment in &self.segments {
            for (text, _) in prefix_terms(segment.reader.dictionary(), field, prefix) {
                terms.entry(text).or_insert(());
            }
        }
        terms.into_keys()
            .filter(|text| self.doc_freq(&Term::new(field, text)) > 0)
            .collect()
    }

    /// Distinct live terms of `field` within the automaton's edit bound,
    /// with their distance, in term order
    pub fn expand_fuzzy(&self, field: &str, automaton: &FuzzyAutomaton) -> Vec<(String, u8)> {
        let mut terms: BTreeMap<String, u8> = BTreeMap::new();
        for segment in &self.segments {
            for (text, distance, _) in automaton.matching_terms(segment.reader.dictionary(), field) {
                terms.insert(text, distance);
            }
        }
        terms.into_iter()
            .filter(|(text, _)| self.doc_freq(&Term::new(field, text)) > 0)
            .collect()
    }
}

/// Publishes snapshots of the on-disk index and caches decoded segments so
/// consecutive snapshots share unchanged segments.
pub struct MVCCController {
    storage: Arc<StorageLayout>,
    current: RwLock<Arc<Snapshot>>,
    segment_cache: Mutex<LruCache<SegmentId, Arc<SegmentReader>>>,
}

impl MVCCController {
    pub fn new(storage: Arc<StorageLayout>, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        MVCCController {
            storage,
            current: RwLock::new(Arc::new(Snapshot::empty())),
            segment_cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Snapshot of the latest committed generation
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        let mut attempt = 0;
        loop {
            let Some(manifest) = Manifest::load(&self.storage)? else {
                return Ok(Arc::new(Snapshot::empty()));
            };

            {
                let current = self.current.read();
                if current.is_current(&manifest) {
                    return Ok(current.clone());
                }
            }

            let opened = self.load_segments(&manifest)
                .and_then(|readers| Snapshot::build(&manifest, readers));
            match opened {
                Ok(snapshot) => {
                    debug!(generation = snapshot.generation, segments = snapshot.segments.len(),
                           docs = snapshot.live_docs, "snapshot opened");
                    let snapshot = Arc::new(snapshot);
                    *self.current.write() = snapshot.clone();
                    return Ok(snapshot);
                }
                Err(e) if e.kind == ErrorKind::Io && attempt < MAX_OPEN_RETRIES => {
                    attempt += 1;
                    warn!(attempt, error = %e, "segment vanished while opening snapshot, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Decoded segments of a manifest, in manifest order
    pub fn load_segments(&self, manifest: &Manifest) -> Result<Vec<Arc<SegmentReader>>> {
        manifest.segments
            .iter()
            .map(|entry| self.segment(&entry.meta))
            .collect()
    }

    pub fn segment(&self, meta: &SegmentMeta) -> Result<Arc<SegmentReader>> {
        if let Some(reader) = self.segment_cache.lock().get(&meta.id) {
            return Ok(reader.clone());
        }
        let reader = Arc::new(SegmentReader::open(&self.storage, meta)?);
        self.segment_cache.lock().put(meta.id, reader.clone());
        Ok(reader)
    }

    /// Drop segments that no longer exist from the cache. Snapshots holding
    /// them keep working.
    pub fn evict(&self, ids: &[SegmentId]) {
        let mut cache = self.segment_cache.lock();
        for id in ids {
            cache.pop(id);
        }
    }
}
