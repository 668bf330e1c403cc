use std::collections::HashMap;
use std::sync::Arc;
use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::length::LengthFilter;
use crate::analysis::filters::lowercase::LowercaseFilter;
use crate::analysis::filters::stopword::StopWordFilter;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{KeywordTokenizer, StandardTokenizer, Tokenizer};
use crate::core::error::{Error, Result};
use crate::schema::schema::Schema;

/// Text analysis pipeline
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Lazy token sequence; pure and deterministic, so it can be restarted by
    /// calling it again.
    pub fn token_stream<'a>(&'a self, text: &'a str) -> impl Iterator<Item = Token> + 'a {
        self.tokenizer
            .tokenize(text)
            .filter_map(move |token| {
                self.filters
                    .iter()
                    .try_fold(token, |token, filter| filter.filter(token))
            })
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        self.token_stream(text).collect()
    }

    pub fn terms(&self, text: &str) -> Vec<String> {
        self.token_stream(text).map(|t| t.text).collect()
    }

    /// Normalize a multi-term query fragment (prefix or fuzzy) without
    /// splitting it.
    pub fn normalize(&self, text: &str) -> String {
        self.filters
            .iter()
            .fold(text.to_string(), |text, filter| filter.normalize(text))
    }

    /// Lowercase, English stop words removed, non-alphanumeric boundaries
    pub fn standard_english() -> Self {
        Analyzer::new("standard".to_string(),
                      Box::new(StandardTokenizer))
            .add_filter(Box::new(LengthFilter::default()))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(StopWordFilter::english()))
    }

    /// Whole value as one exact token
    pub fn keyword() -> Self {
        Analyzer::new("keyword".to_string(), Box::new(KeywordTokenizer))
    }
}

/// Registry for managing analyzers
pub struct AnalyzerRegistry {
    analyzers: HashMap<String, Arc<Analyzer>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        let mut registry = AnalyzerRegistry {
            analyzers: HashMap::new(),
        };

        // Register default analyzers
        registry.register("standard", Analyzer::standard_english());
        registry.register("keyword", Analyzer::keyword());
        registry
    }

    pub fn register(&mut self, name: &str, analyzer: Analyzer) {
        self.analyzers.insert(name.to_string(), Arc::new(analyzer));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Analyzer>> {
        self.analyzers.get(name).cloned()
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the analyzer for each field of a schema. Both the writer and the
/// query builder go through this, so a field is always analyzed the same way
/// when indexing and when searching.
#[derive(Clone)]
pub struct FieldAnalyzers {
    by_field: HashMap<String, Arc<Analyzer>>,
    default: Arc<Analyzer>,
}

impl FieldAnalyzers {
    pub fn new(schema: &Schema, registry: &AnalyzerRegistry) -> Result<Self> {
        let lookup = |name: &str| {
            registry.get(name).ok_or_else(|| {
                Error::invalid_argument(format!("Analyzer '{}' not found", name))
            })
        };

        let mut by_field = HashMap::new();
        for field in schema.indexed_fields() {
            by_field.insert(field.name.clone(), lookup(schema.analyzer_for(&field.name))?);
        }

        Ok(FieldAnalyzers {
            by_field,
            default: lookup(&schema.default_analyzer)?,
        })
    }

    pub fn for_field(&self, field: &str) -> &Analyzer {
        self.by_field.get(field).unwrap_or(&self.default)
    }

    pub fn tokenize(&self, field: &str, text: &str) -> Vec<Token> {
        self.for_field(field).analyze(text)
    }

    pub fn terms(&self, field: &str, text: &str) -> Vec<String> {
        self.for_field(field).terms(text)
    }

    pub fn normalize(&self, field: &str, text: &str) -> String {
        self.for_field(field).normalize(text)
    }
}
