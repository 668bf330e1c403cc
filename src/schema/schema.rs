use serde::{Serialize, Deserialize};
use crate::core::error::{Error, Result};
use crate::core::types::{Document, FieldValue, Fingerprint};

pub const PATH_FIELD: &str = "path";
pub const CONTENT_FIELD: &str = "content";
pub const LAST_MODIFIED_FIELD: &str = "lastModified";
pub const SIZE_FIELD: &str = "size";

/// How a field is stored and indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldPolicy {
    /// Tokenized, searchable, original value retrievable
    IndexedStored,
    /// Retrievable, not searchable
    StoredOnly,
    /// Stored and indexed as a single exact token; unique per document
    Keyed,
}

impl FieldPolicy {
    pub fn is_indexed(&self) -> bool {
        !matches!(self, FieldPolicy::StoredOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub policy: FieldPolicy,
    pub analyzer: Option<String>,  // Analyzer name for indexed fields
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldDefinition>,
    pub default_analyzer: String,
}

impl Schema {
    pub fn new() -> Self {
        Schema {
            fields: Vec::new(),
            default_analyzer: "standard".to_string(),
        }
    }

    /// `path` keyed, `content` full text, fingerprint stored alongside.
    pub fn file_index() -> Self {
        Schema::new()
            .add_key_field(PATH_FIELD)
            .add_text_field(CONTENT_FIELD, None)
            .add_stored_field(LAST_MODIFIED_FIELD)
            .add_stored_field(SIZE_FIELD)
    }

    pub fn add_text_field(mut self, name: &str, analyzer: Option<String>) -> Self {
        self.fields.push(FieldDefinition {
            name: name.to_string(),
            policy: FieldPolicy::IndexedStored,
            analyzer,
        });
        self
    }

    pub fn add_stored_field(mut self, name: &str) -> Self {
        self.fields.push(FieldDefinition {
            name: name.to_string(),
            policy: FieldPolicy::StoredOnly,
            analyzer: None,
        });
        self
    }

    pub fn add_key_field(mut self, name: &str) -> Self {
        self.fields.push(FieldDefinition {
            name: name.to_string(),
            policy: FieldPolicy::Keyed,
            analyzer: Some("keyword".to_string()),
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn key_field(&self) -> Result<&str> {
        self.fields
            .iter()
            .find(|f| f.policy == FieldPolicy::Keyed)
            .map(|f| f.name.as_str())
            .ok_or_else(|| Error::invalid_argument("schema has no keyed field"))
    }

    /// Analyzer used for a field at both index and query time. Fields the
    /// schema does not know fall back to the default analyzer.
    pub fn analyzer_for(&self, field_name: &str) -> &str {
        self.field(field_name)
            .and_then(|f| f.analyzer.as_deref())
            .unwrap_or(&self.default_analyzer)
    }

    pub fn indexed_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.policy.is_indexed())
    }

    pub fn validate(&self) -> Result<()> {
        let keyed = self.fields.iter().filter(|f| f.policy == FieldPolicy::Keyed).count();
        if keyed != 1 {
            return Err(Error::invalid_argument(format!(
                "schema must declare exactly one keyed field, found {}", keyed
            )));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() || field.name.contains('\0') {
                return Err(Error::invalid_argument(format!("invalid field name '{}'", field.name)));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(Error::invalid_argument(format!("duplicate field '{}'", field.name)));
            }
        }
        Ok(())
    }

    /// Check a document against the schema and return its key value.
    pub fn validate_document<'a>(&self, doc: &'a Document) -> Result<&'a str> {
        for name in doc.fields.keys() {
            if self.field(name).is_none() && !is_fingerprint_field(name) {
                return Err(Error::invalid_argument(format!("field '{}' is not in the schema", name)));
            }
        }
        for field in self.indexed_fields() {
            if let Some(value) = doc.get_field(&field.name) {
                if value.as_text().is_none() {
                    return Err(Error::invalid_argument(format!(
                        "indexed field '{}' must hold text", field.name
                    )));
                }
            }
        }

        let key_field = self.key_field()?;
        match doc.get_text(key_field) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(Error::invalid_argument(format!(
                "document is missing key field '{}'", key_field
            ))),
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::file_index()
    }
}

fn is_fingerprint_field(name: &str) -> bool {
    name == LAST_MODIFIED_FIELD || name == SIZE_FIELD
}

/// Record a fingerprint as the two stored integer fields.
pub fn attach_fingerprint(doc: &mut Document, fingerprint: Fingerprint) {
    doc.add_field(LAST_MODIFIED_FIELD.to_string(), FieldValue::Integer(fingerprint.last_modified));
    doc.add_field(SIZE_FIELD.to_string(), FieldValue::Integer(fingerprint.size as i64));
}

/// Read a fingerprint back. Returns None when either component is absent.
pub fn stored_fingerprint(doc: &Document) -> Option<Fingerprint> {
    let last_modified = doc.get_field(LAST_MODIFIED_FIELD)?.as_integer()?;
    let size = doc.get_field(SIZE_FIELD)?.as_integer()?;
    Some(Fingerprint::new(last_modified, size as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_index_schema() {
        let schema = Schema::file_index();
        schema.validate().unwrap();
        assert_eq!(schema.key_field().unwrap(), PATH_FIELD);
        assert_eq!(schema.analyzer_for(PATH_FIELD), "keyword");
        assert_eq!(schema.analyzer_for(CONTENT_FIELD), "standard");
        assert_eq!(schema.analyzer_for("title"), "standard");
        assert!(!schema.field(SIZE_FIELD).unwrap().policy.is_indexed());
    }

    #[test]
    fn test_schema_requires_one_key() {
        let schema = Schema::new().add_text_field("body", None);
        assert!(schema.validate().is_err());

        let schema = Schema::new().add_key_field("a").add_key_field("b");
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_validate_document() {
        let schema = Schema::file_index();
        let doc = Document::new()
            .with_field(PATH_FIELD, "a.txt")
            .with_field(CONTENT_FIELD, "text");
        assert_eq!(schema.validate_document(&doc).unwrap(), "a.txt");

        let unknown = doc.clone().with_field("author", "someone");
        assert!(schema.validate_document(&unknown).is_err());

        let keyless = Document::new().with_field(CONTENT_FIELD, "text");
        assert!(schema.validate_document(&keyless).is_err());
    }

    #[test]
    fn test_fingerprint_fields() {
        let mut doc = Document::new().with_field(PATH_FIELD, "a.txt");
        assert_eq!(stored_fingerprint(&doc), None);

        attach_fingerprint(&mut doc, Fingerprint::new(100, 50));
        assert_eq!(stored_fingerprint(&doc), Some(Fingerprint::new(100, 50)));

        doc.fields.remove(SIZE_FIELD);
        assert_eq!(stored_fingerprint(&doc), None);
    }
}
