use std::fs;
use std::path::Path;
use std::sync::Arc;
use parking_lot::Mutex;
use tracing::{debug, info};
use crate::analysis::analyzer::{AnalyzerRegistry, FieldAnalyzers};
use crate::analysis::token::Token;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::stats::{FileInfo, IndexStats, SegmentInfo};
use crate::core::types::{Document, Fingerprint};
use crate::mvcc::controller::MVCCController;
use crate::parallel::indexer::ParallelIndexer;
use crate::query::ast::Query;
use crate::query::builder::QueryBuilder;
use crate::reader::freshness::FreshnessOracle;
use crate::reader::snapshot_reader::IndexReader;
use crate::schema::schema::{FieldPolicy, Schema};
use crate::search::results::SearchResults;
use crate::storage::layout::StorageLayout;
use crate::storage::manifest::Manifest;
use crate::writer::index_writer::{CommitInfo, IndexWriter};

/// Entry point to an index directory.
///
/// Hands out writers and readers that share one segment cache. The
/// convenience methods (`upsert`, `delete`, `search`, ...) open a writer or
/// reader for the duration of the call.
pub struct Index {
    config: Config,
    storage: Arc<StorageLayout>,
    schema: Arc<Schema>,
    analyzers: Arc<FieldAnalyzers>,
    controller: Arc<MVCCController>,
    // Serializes the convenience writes of this handle
    write_guard: Mutex<()>,
}

impl Index {
    /// Open with the file index schema
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_schema(Schema::file_index(), config)
    }

    /// Nothing is created on disk until the first commit.
    pub fn open_with_schema(schema: Schema, config: Config) -> Result<Self> {
        schema.validate()?;
        let storage = Arc::new(StorageLayout::new(config.storage_path.clone()));

        if let Some(manifest) = Manifest::load(&storage)? {
            let stored_key = manifest.schema.key_field()?;
            let key = schema.key_field()?;
            if stored_key != key {
                return Err(Error::invalid_argument(format!(
                    "index is keyed on '{}', not '{}'", stored_key, key
                )));
            }
        }

        let analyzers = Arc::new(FieldAnalyzers::new(&schema, &AnalyzerRegistry::new())?);
        let controller = Arc::new(MVCCController::new(storage.clone(), config.segment_cache_size));
        debug!(path = %config.storage_path.display(), "index opened");

        Ok(Index {
            config,
            storage,
            schema: Arc::new(schema),
            analyzers,
            controller,
            write_guard: Mutex::new(()),
        })
    }

    /// Whether a commit has ever been made in this directory
    pub fn exists(&self) -> bool {
        self.storage.manifest_path().is_file()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Exclusive writer; fails with `WriteFailure` while another one is open
    pub fn writer(&self) -> Result<IndexWriter> {
        let indexer = ParallelIndexer::new(
            self.schema.clone(),
            self.analyzers.clone(),
            self.config.parallel_analysis_threshold,
        );
        IndexWriter::open(self.storage.clone(), indexer, self.controller.clone(), &self.config)
    }

    /// Reader pinned to the latest commit. An index that was never committed
    /// reads as empty.
    pub fn reader(&self) -> Result<IndexReader> {
        let snapshot = self.controller.snapshot()?;
        Ok(IndexReader::new(snapshot, self.schema.clone(), self.analyzers.clone(), &self.config))
    }

    /// Index `content` under `key`, replacing any previous version, and commit.
    pub fn upsert(&self, key: &str, content: &str, fingerprint: Option<Fingerprint>) -> Result<CommitInfo> {
        let doc = Document::new()
            .with_field(self.schema.key_field()?, key)
            .with_field(self.content_field()?, content);

        let _guard = self.write_guard.lock();
        let mut writer = self.writer()?;
        writer.upsert(doc, fingerprint)?;
        writer.commit()
    }

    /// Remove the document with `key` and commit. Absent keys are a no-op.
    pub fn delete(&self, key: &str) -> Result<CommitInfo> {
        let _guard = self.write_guard.lock();
        let mut writer = self.writer()?;
        writer.delete(key)?;
        writer.commit()
    }

    pub fn needs_reindex(&self, key: &str, fingerprint: Fingerprint) -> Result<bool> {
        if !self.exists() {
            return FreshnessOracle::new(None).needs_reindex(key, fingerprint);
        }
        let reader = self.reader()?;
        FreshnessOracle::new(Some(&reader)).needs_reindex(key, fingerprint)
    }

    /// Parse `text` against `field` and return the top `top_k` hits.
    /// Syntax errors are reported even when the index does not exist yet.
    pub fn search(&self, text: &str, field: &str, top_k: usize) -> Result<SearchResults> {
        let query = self.parse_query(text, field)?;
        if !self.exists() {
            return Ok(SearchResults::default());
        }
        let results = self.reader()?.search(&query, top_k)?;
        info!(query = %query, total_hits = results.total_hits, "search");
        Ok(results)
    }

    pub fn parse_query(&self, text: &str, field: &str) -> Result<Query> {
        QueryBuilder::new(&self.analyzers)
            .with_fuzzy_max_edits(self.config.fuzzy_max_edits)
            .build(text, field)
    }

    /// Tokens `text` produces for `field`, as indexed and as queried
    pub fn analyze(&self, field: &str, text: &str) -> Vec<Token> {
        self.analyzers.tokenize(field, text)
    }

    /// Live segments of the latest commit, in manifest order
    pub fn list_segments(&self) -> Result<Vec<SegmentInfo>> {
        let Some(manifest) = Manifest::load(&self.storage)? else {
            return Ok(Vec::new());
        };
        manifest.segments
            .iter()
            .map(|entry| {
                let live = entry.live_count()?;
                Ok(SegmentInfo {
                    name: entry.meta.id.file_name(),
                    size_bytes: entry.meta.size_bytes,
                    doc_count: entry.meta.doc_count,
                    deleted_docs: entry.meta.doc_count - live,
                })
            })
            .collect()
    }

    /// Every file under the index directory, sorted by relative path
    pub fn list_files(&self) -> Result<Vec<FileInfo>> {
        let mut files = Vec::new();
        if self.storage.base_dir().is_dir() {
            collect_files(self.storage.base_dir(), self.storage.base_dir(), &mut files)?;
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let segments = self.list_segments()?;
        let (generation, committed_at) = match Manifest::load(&self.storage)? {
            Some(manifest) => (manifest.generation, Some(manifest.committed_at)),
            None => (0, None),
        };
        Ok(IndexStats::from_segments(generation, committed_at, &segments))
    }

    /// First indexed, non-key field; where `upsert` puts the content
    fn content_field(&self) -> Result<&str> {
        self.schema.fields
            .iter()
            .find(|f| f.policy == FieldPolicy::IndexedStored)
            .map(|f| f.name.as_str())
            .ok_or_else(|| Error::invalid_argument("schema has no full-text field"))
    }
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<FileInfo>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        let path = entry.path();
        if metadata.is_dir() {
            collect_files(root, &path, files)?;
        } else {
            let name = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().into_owned();
            files.push(FileInfo { name, size_bytes: metadata.len() });
        }
    }
    Ok(())
}
