use tracing::debug;
use crate::core::error::Result;
use crate::core::types::Fingerprint;
use crate::reader::snapshot_reader::IndexReader;
use crate::schema::schema::stored_fingerprint;

/// Decides whether a source needs (re)indexing by comparing its current
/// fingerprint with the one stored at index time.
///
/// Anything uncertain answers yes: no index, unknown key, or a document
/// indexed without a fingerprint.
pub struct FreshnessOracle<'a> {
    reader: Option<&'a IndexReader>,
}

impl<'a> FreshnessOracle<'a> {
    /// `None` stands for an index that does not exist yet
    pub fn new(reader: Option<&'a IndexReader>) -> Self {
        FreshnessOracle { reader }
    }

    pub fn needs_reindex(&self, key: &str, current: Fingerprint) -> Result<bool> {
        let Some(reader) = self.reader else {
            return Ok(true);
        };

        let stale = match reader.document_by_key(key)?.as_ref().and_then(stored_fingerprint) {
            None => true,
            Some(stored) => {
                stored.last_modified != current.last_modified || stored.size != current.size
            }
        };
        debug!(key, stale, "freshness check");
        Ok(stale)
    }
}
