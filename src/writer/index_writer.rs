use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, info, warn};
use crate::compression::compress::CompressionType;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{Document, Fingerprint};
use crate::index::inverted::Term;
use crate::mvcc::controller::MVCCController;
use crate::parallel::indexer::ParallelIndexer;
use crate::parallel::merger::SegmentMerger;
use crate::schema::schema::Schema;
use crate::storage::file_lock::FileLock;
use crate::storage::layout::StorageLayout;
use crate::storage::manifest::{Manifest, ManifestSegment};
use crate::storage::merge_policy::{MergePolicy, TieredMergePolicy};
use crate::storage::segment::{SegmentData, SegmentId, SegmentMeta};
use crate::storage::segment_writer::SegmentWriter;
use crate::writer::batch::{Operation, WriteBatch};

/// Outcome of a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub generation: u64,
    pub added: usize,      // Documents written by this commit
    pub removed: usize,    // Previous versions tombstoned (replaced or deleted)
    pub segments: usize,   // Segments in the new generation
    pub merges: usize,
}

/// Single writer. Holds the index's write lock from `open` until it is
/// closed or dropped; a second writer fails with `WriteFailure`.
///
/// Changes are staged with `upsert` / `delete` and become visible to new
/// readers atomically on `commit`. A failed commit leaves the store exactly
/// as it was.
pub struct IndexWriter {
    pub storage: Arc<StorageLayout>,
    pub schema: Arc<Schema>,
    pub mvcc: Arc<MVCCController>,
    pub indexer: ParallelIndexer,
    pub merge_policy: Box<dyn MergePolicy>,
    pub compression: CompressionType,
    pending: WriteBatch,
    _lock: FileLock,
}

impl IndexWriter {
    pub fn open(
        storage: Arc<StorageLayout>,
        indexer: ParallelIndexer,
        mvcc: Arc<MVCCController>,
        config: &Config,
    ) -> Result<Self> {
        storage.create_dirs().map_err(Error::into_write_failure)?;
        let lock = FileLock::acquire(&storage)?;

        let writer = IndexWriter {
            schema: indexer.schema.clone(),
            storage,
            mvcc,
            indexer,
            merge_policy: Box::new(TieredMergePolicy::new(config.max_segments, config.merge_factor)),
            compression: config.compression,
            pending: WriteBatch::new(),
            _lock: lock,
        };
        writer.remove_orphans().map_err(Error::into_write_failure)?;
        Ok(writer)
    }

    /// Stage a document, replacing any indexed document with the same key
    pub fn upsert(&mut self, doc: Document, fingerprint: Option<Fingerprint>) -> Result<()> {
        self.schema.validate_document(&doc)?;
        match fingerprint {
            Some(fp) => self.pending.upsert_with_fingerprint(doc, fp),
            None => self.pending.upsert(doc),
        };
        Ok(())
    }

    /// Stage removal of the document with `key`; absent keys are a no-op
    pub fn delete(&mut self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::invalid_argument("cannot delete an empty key"));
        }
        self.pending.delete(key);
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Commit everything staged so far. On failure the staged changes are
    /// kept, so the commit can be retried.
    pub fn commit(&mut self) -> Result<CommitInfo> {
        let info = self.commit_batch(&self.pending)?;
        self.pending = WriteBatch::new();
        Ok(info)
    }

    /// Apply `batch` as one atomic commit
    pub fn commit_batch(&self, batch: &WriteBatch) -> Result<CommitInfo> {
        let operations = batch.resolve(&self.schema)?;

        let mut created = Vec::new();
        let result = self.apply(operations, &mut created);
        if let Err(e) = &result {
            warn!(error = %e, "commit failed, discarding new segments");
            self.discard_uncommitted(&created);
        }
        result.map_err(Error::into_write_failure)
    }

    /// Commit pending changes and release the write lock
    pub fn close(mut self) -> Result<()> {
        self.commit()?;
        debug!(path = %self.storage.base_dir.display(), "writer closed");
        Ok(())
    }

    fn apply(
        &self,
        operations: BTreeMap<String, Operation>,
        created: &mut Vec<SegmentId>,
    ) -> Result<CommitInfo> {
        let base = Manifest::load(&self.storage)?;
        if operations.is_empty() {
            if let Some(current) = &base {
                return Ok(CommitInfo {
                    generation: current.generation,
                    added: 0,
                    removed: 0,
                    segments: current.segments.len(),
                    merges: 0,
                });
            }
        }
        let base = base.unwrap_or_else(|| Manifest::new((*self.schema).clone()));
        let mut manifest = base.clone();
        manifest.generation += 1;

        // Tombstone every existing version of the touched keys
        let key_field = self.schema.key_field()?;
        let readers = self.mvcc.load_segments(&base)?;
        let mut removed = 0;
        for (entry, reader) in manifest.segments.iter_mut().zip(&readers) {
            let mut deleted = entry.deleted_docs()?;
            let before = deleted.len();
            for key in operations.keys() {
                for record in reader.term_postings(&Term::new(key_field, key)) {
                    deleted.insert(record.doc);
                }
            }
            if deleted.len() != before {
                removed += (deleted.len() - before) as usize;
                entry.set_deleted_docs(&deleted)?;
            }
        }

        let upserts: Vec<Document> = operations
            .into_values()
            .filter_map(|op| match op {
                Operation::Upsert(doc) => Some(doc),
                Operation::Delete(_) => None,
            })
            .collect();
        let added = upserts.len();
        if !upserts.is_empty() {
            let data = self.indexer.build_segment(upserts)?;
            let meta = self.write_segment(&data, created)?;
            manifest.segments.push(ManifestSegment::new(meta));
        }

        let mut kept = Vec::with_capacity(manifest.segments.len());
        for entry in manifest.segments.drain(..) {
            if entry.live_count()? > 0 {
                kept.push(entry);
            }
        }
        manifest.segments = kept;

        let merges = self.merge(&mut manifest, created)?;

        manifest.committed_at = Utc::now();
        manifest.save(&self.storage)?;

        // Past the commit point: failures below only leave garbage behind
        let obsolete: Vec<SegmentId> = base.segment_ids()
            .chain(created.iter().copied())
            .filter(|id| !manifest.contains(id))
            .collect();
        self.remove_segment_files(&obsolete);
        self.mvcc.evict(&obsolete);

        info!(
            generation = manifest.generation,
            added,
            removed,
            segments = manifest.segments.len(),
            merges,
            "commit"
        );

        Ok(CommitInfo {
            generation: manifest.generation,
            added,
            removed,
            segments: manifest.segments.len(),
            merges,
        })
    }

    /// Merge until the policy is satisfied. Returns the number of merges.
    fn merge(&self, manifest: &mut Manifest, created: &mut Vec<SegmentId>) -> Result<usize> {
        let mut merges = 0;
        loop {
            let metas: Vec<SegmentMeta> = manifest.segments.iter().map(|s| s.meta.clone()).collect();
            if !self.merge_policy.should_merge(&metas) {
                return Ok(merges);
            }
            let selected = self.merge_policy.select_segments_to_merge(&metas);
            if selected.len() < 2 {
                return Ok(merges);
            }

            let (chosen, rest): (Vec<ManifestSegment>, Vec<ManifestSegment>) = manifest.segments
                .drain(..)
                .partition(|s| selected.contains(&s.id()));

            let mut inputs = Vec::with_capacity(chosen.len());
            for entry in &chosen {
                inputs.push((self.mvcc.segment(&entry.meta)?, entry.deleted_docs()?));
            }
            let data = SegmentMerger::merge(&inputs)?;

            manifest.segments = rest;
            if data.doc_count() > 0 {
                let meta = self.write_segment(&data, created)?;
                manifest.segments.push(ManifestSegment::new(meta));
            }
            merges += 1;
            debug!(inputs = chosen.len(), docs = data.doc_count(), "segments merged");
        }
    }

    fn write_segment(&self, data: &SegmentData, created: &mut Vec<SegmentId>) -> Result<SegmentMeta> {
        let id = SegmentId::new();
        created.push(id);
        SegmentWriter::new(&self.storage, id, self.compression)?.finish(data)
    }

    fn remove_segment_files(&self, ids: &[SegmentId]) {
        for id in ids {
            let path = self.storage.segment_path(id);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(segment = %id, error = %e, "could not remove segment file"),
            }
        }
    }

    /// Remove segments written by a failed commit, unless the manifest on
    /// disk already references them
    fn discard_uncommitted(&self, ids: &[SegmentId]) {
        let committed = match Manifest::load(&self.storage) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(error = %e, "manifest unreadable, leaving new segments for the next open");
                return;
            }
        };
        let uncommitted: Vec<SegmentId> = ids
            .iter()
            .copied()
            .filter(|id| !committed.as_ref().is_some_and(|m| m.contains(id)))
            .collect();
        self.remove_segment_files(&uncommitted);
    }

    /// Delete segment files and temp files left by an interrupted commit
    fn remove_orphans(&self) -> Result<()> {
        let manifest = Manifest::load(&self.storage)?;
        let orphans: Vec<SegmentId> = self.storage
            .segment_files()?
            .into_iter()
            .filter(|id| !manifest.as_ref().is_some_and(|m| m.contains(id)))
            .collect();
        if !orphans.is_empty() {
            warn!(count = orphans.len(), "removing unreferenced segment files");
            self.remove_segment_files(&orphans);
        }

        for entry in fs::read_dir(self.storage.base_dir())? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(".tmp") {
                if let Err(e) = fs::remove_file(entry.path()) {
                    warn!(file = %entry.path().display(), error = %e, "could not remove temp file");
                }
            }
        }
        Ok(())
    }
}
