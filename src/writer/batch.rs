use std::collections::BTreeMap;
use crate::core::error::{Error, Result};
use crate::core::types::{Document, Fingerprint};
use crate::schema::schema::{attach_fingerprint, Schema};
use crate::writer::index_writer::{CommitInfo, IndexWriter};

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Insert, or replace the document with the same key
    Upsert(Document),
    /// Remove the document with this key, if any
    Delete(String),
}

/// Ordered changes applied together by one commit
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    operations: Vec<Operation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, doc: Document) -> &mut Self {
        self.operations.push(Operation::Upsert(doc));
        self
    }

    /// Upsert with the source's change fingerprint stored alongside
    pub fn upsert_with_fingerprint(&mut self, mut doc: Document, fingerprint: Fingerprint) -> &mut Self {
        attach_fingerprint(&mut doc, fingerprint);
        self.upsert(doc)
    }

    pub fn delete(&mut self, key: &str) -> &mut Self {
        self.operations.push(Operation::Delete(key.to_string()));
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Validate against the schema and keep only the last operation per key
    pub fn resolve(&self, schema: &Schema) -> Result<BTreeMap<String, Operation>> {
        let mut resolved = BTreeMap::new();
        for operation in &self.operations {
            let key = match &operation {
                Operation::Upsert(doc) => schema.validate_document(doc)?.to_string(),
                Operation::Delete(key) if key.is_empty() => {
                    return Err(Error::invalid_argument("cannot delete an empty key"));
                }
                Operation::Delete(key) => key.clone(),
            };
            resolved.insert(key, operation.clone());
        }
        Ok(resolved)
    }
}

/// Bulk loader: stages upserts and commits every `batch_size` documents
pub struct BatchWriter {
    pub writer: IndexWriter,
    pub buffer: WriteBatch,
    pub batch_size: usize,
}

impl BatchWriter {
    pub fn new(writer: IndexWriter, batch_size: usize) -> Self {
        BatchWriter {
            writer,
            buffer: WriteBatch::new(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn add(&mut self, doc: Document, fingerprint: Option<Fingerprint>) -> Result<()> {
        self.writer.schema.validate_document(&doc)?;
        match fingerprint {
            Some(fp) => self.buffer.upsert_with_fingerprint(doc, fp),
            None => self.buffer.upsert(doc),
        };

        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }

        Ok(())
    }

    pub fn flush(&mut self) -> Result<Option<CommitInfo>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let info = self.writer.commit_batch(&self.buffer)?;
        self.buffer = WriteBatch::new();
        Ok(Some(info))
    }

    pub fn finish(mut self) -> Result<()> {
        self.flush()?;
        self.writer.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::schema::{CONTENT_FIELD, PATH_FIELD};

    fn doc(path: &str, content: &str) -> Document {
        Document::new()
            .with_field(PATH_FIELD, path)
            .with_field(CONTENT_FIELD, content)
    }

    #[test]
    fn test_last_operation_per_key_wins() {
        let mut batch = WriteBatch::new();
        batch.upsert(doc("a.txt", "one"))
            .upsert(doc("b.txt", "two"))
            .delete("a.txt")
            .upsert(doc("b.txt", "three"));

        let resolved = batch.resolve(&Schema::file_index()).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["a.txt"], Operation::Delete("a.txt".to_string()));
        assert_eq!(resolved["b.txt"], Operation::Upsert(doc("b.txt", "three")));
    }

    #[test]
    fn test_invalid_documents_are_rejected() {
        let mut batch = WriteBatch::new();
        batch.upsert(Document::new().with_field(CONTENT_FIELD, "no key"));
        assert!(batch.resolve(&Schema::file_index()).is_err());

        let mut batch = WriteBatch::new();
        batch.delete("");
        assert!(batch.resolve(&Schema::file_index()).is_err());
    }

    #[test]
    fn test_fingerprint_is_attached() {
        let mut batch = WriteBatch::new();
        batch.upsert_with_fingerprint(doc("a.txt", "x"), Fingerprint::new(10, 20));
        match &batch.operations()[0] {
            Operation::Upsert(d) => {
                assert_eq!(crate::schema::schema::stored_fingerprint(d), Some(Fingerprint::new(10, 20)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
