use std::sync::Arc;
use crate::analysis::analyzer::FieldAnalyzers;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::types::{DocId, Document};
use crate::index::inverted::Term;
use crate::index::posting::PostingList;
use crate::mvcc::controller::Snapshot;
use crate::query::ast::Query;
use crate::query::builder::QueryBuilder;
use crate::schema::schema::Schema;
use crate::scoring::scorer::Scorer;
use crate::search::executor::QueryExecutor;
use crate::search::results::SearchResults;

/// Read-only view of one committed generation.
///
/// Everything a reader returns comes from the snapshot it was opened on;
/// commits that happen afterwards are invisible until a new reader is
/// opened. Cheap to clone the underlying snapshot, safe to share across
/// threads.
pub struct IndexReader {
    snapshot: Arc<Snapshot>,
    schema: Arc<Schema>,
    analyzers: Arc<FieldAnalyzers>,
    scorer: Box<dyn Scorer>,
    fuzzy_max_edits: u8,
    fuzzy_max_expansions: usize,
}

impl IndexReader {
    pub fn new(
        snapshot: Arc<Snapshot>,
        schema: Arc<Schema>,
        analyzers: Arc<FieldAnalyzers>,
        config: &Config,
    ) -> Self {
        IndexReader {
            snapshot,
            schema,
            analyzers,
            scorer: config.similarity.scorer(config),
            fuzzy_max_edits: config.fuzzy_max_edits,
            fuzzy_max_expansions: config.fuzzy_max_expansions,
        }
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.generation
    }

    /// Live documents in this snapshot
    pub fn num_docs(&self) -> u32 {
        self.snapshot.num_docs()
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    pub fn lookup_by_key(&self, key: &str) -> Result<Option<DocId>> {
        let key_field = self.schema.key_field()?;
        Ok(self.snapshot.lookup_key(key_field, key))
    }

    /// Stored fields of a live document; `None` for deleted or unknown ids
    pub fn stored_fields(&self, doc_id: DocId) -> Option<Document> {
        self.snapshot.document(doc_id).cloned()
    }

    pub fn document_by_key(&self, key: &str) -> Result<Option<Document>> {
        Ok(self.lookup_by_key(key)?.and_then(|id| self.stored_fields(id)))
    }

    pub fn postings(&self, field: &str, text: &str) -> PostingList {
        self.snapshot.postings(&Term::new(field, text))
    }

    /// Full scan over live documents
    pub fn documents(&self) -> impl Iterator<Item = (DocId, &Document)> + '_ {
        self.snapshot.documents()
    }

    pub fn parse_query(&self, text: &str, field: &str) -> Result<Query> {
        QueryBuilder::new(&self.analyzers)
            .with_fuzzy_max_edits(self.fuzzy_max_edits)
            .build(text, field)
    }

    /// Top `top_k` hits with stored fields attached
    pub fn search(&self, query: &Query, top_k: usize) -> Result<SearchResults> {
        let mut results = QueryExecutor::new(&self.snapshot, self.scorer.as_ref())
            .with_fuzzy_max_expansions(self.fuzzy_max_expansions)
            .execute_query(query, top_k)?;

        for hit in &mut results.hits {
            hit.document = self.stored_fields(hit.doc_id);
        }
        Ok(results)
    }

    pub fn search_text(&self, text: &str, field: &str, top_k: usize) -> Result<SearchResults> {
        let query = self.parse_query(text, field)?;
        self.search(&query, top_k)
    }

    pub fn close(self) {}
}
