use rayon::prelude::*;
use std::sync::Arc;
use crate::analysis::analyzer::FieldAnalyzers;
use crate::analysis::token::Token;
use crate::core::error::Result;
use crate::core::types::Document;
use crate::index::inverted::InvertedIndex;
use crate::schema::schema::Schema;
use crate::storage::segment::SegmentData;

/// A document with the token streams of its indexed fields
#[derive(Debug, Clone)]
pub struct AnalyzedDocument {
    pub stored: Document,
    pub fields: Vec<(String, Vec<Token>)>,
}

/// Turns a batch of documents into segment data, analyzing on the rayon
/// pool once the batch is large enough to pay for it.
pub struct ParallelIndexer {
    pub schema: Arc<Schema>,
    pub analyzers: Arc<FieldAnalyzers>,
    pub parallel_threshold: usize,
}

impl ParallelIndexer {
    pub fn new(schema: Arc<Schema>, analyzers: Arc<FieldAnalyzers>, parallel_threshold: usize) -> Self {
        ParallelIndexer {
            schema,
            analyzers,
            parallel_threshold,
        }
    }

    /// Analyze in input order
    pub fn index_batch(&self, documents: Vec<Document>) -> Vec<AnalyzedDocument> {
        if documents.len() >= self.parallel_threshold {
            documents
                .into_par_iter()
                .map(|doc| self.index_document(doc))
                .collect()
        } else {
            documents
                .into_iter()
                .map(|doc| self.index_document(doc))
                .collect()
        }
    }

    pub fn build_segment(&self, documents: Vec<Document>) -> Result<SegmentData> {
        let mut index = InvertedIndex::new();
        for analyzed in self.index_batch(documents) {
            index.add_document(analyzed.stored, &analyzed.fields);
        }
        index.build()
    }

    fn index_document(&self, doc: Document) -> AnalyzedDocument {
        let fields = self.schema
            .indexed_fields()
            .filter_map(|field| {
                let text = doc.get_text(&field.name)?;
                Some((field.name.clone(), self.analyzers.tokenize(&field.name, text)))
            })
            .collect();

        AnalyzedDocument {
            stored: doc,
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::AnalyzerRegistry;
    use crate::schema::schema::{CONTENT_FIELD, PATH_FIELD, SIZE_FIELD};

    fn indexer(threshold: usize) -> ParallelIndexer {
        let schema = Arc::new(Schema::file_index());
        let analyzers = Arc::new(FieldAnalyzers::new(&schema, &AnalyzerRegistry::new()).unwrap());
        ParallelIndexer::new(schema, analyzers, threshold)
    }

    fn docs(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| {
                Document::new()
                    .with_field(PATH_FIELD, format!("doc{}.txt", i))
                    .with_field(CONTENT_FIELD, format!("Lucene in Action chapter {}", i))
                    .with_field(SIZE_FIELD, i as i64)
            })
            .collect()
    }

    #[test]
    fn test_only_indexed_fields_are_analyzed() {
        let analyzed = indexer(100).index_batch(docs(1));
        let fields: Vec<&str> = analyzed[0].fields.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(fields, vec![PATH_FIELD, CONTENT_FIELD]);
        assert_eq!(analyzed[0].fields[0].1[0].text, "doc0.txt");
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let parallel = indexer(1).index_batch(docs(50));
        let sequential = indexer(1000).index_batch(docs(50));
        assert_eq!(parallel.len(), sequential.len());
        for (a, b) in parallel.iter().zip(&sequential) {
            assert_eq!(a.stored, b.stored);
            assert_eq!(a.fields, b.fields);
        }
    }
}
