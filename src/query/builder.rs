use std::sync::LazyLock;
use regex::Regex;
use crate::analysis::analyzer::FieldAnalyzers;
use crate::core::error::Result;
use crate::query::ast::{BoolQuery, Query};
use crate::query::parser::QueryParser;
use crate::search::fuzzy::MAX_EDIT_DISTANCE;

/// A single plain word, eligible for typo-tolerant expansion
static SIMPLE_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("valid pattern"));

/// Turns user input into a `Query`.
///
/// A lone alphanumeric word that analyzes to exactly one token is expanded
/// to `prefix OR fuzzy`, so `luc` and `lucnee` both find `lucene`. Anything
/// else goes through the full query parser.
pub struct QueryBuilder<'a> {
    analyzers: &'a FieldAnalyzers,
    fuzzy_max_edits: u8,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(analyzers: &'a FieldAnalyzers) -> Self {
        QueryBuilder {
            analyzers,
            fuzzy_max_edits: MAX_EDIT_DISTANCE,
        }
    }

    pub fn with_fuzzy_max_edits(mut self, max_edits: u8) -> Self {
        self.fuzzy_max_edits = max_edits.min(MAX_EDIT_DISTANCE);
        self
    }

    pub fn build(&self, text: &str, field: &str) -> Result<Query> {
        // Surrounding whitespace disqualifies the input, as any operator does
        if SIMPLE_TERM.is_match(text) {
            let mut terms = self.analyzers.terms(field, text);
            if terms.len() == 1 {
                if let Some(term) = terms.pop() {
                    return Ok(Query::Bool(
                        BoolQuery::new()
                            .with_should(Query::prefix(field, &term))
                            .with_should(Query::fuzzy(field, &term, self.fuzzy_max_edits)),
                    ));
                }
            }
        }

        QueryParser::new(self.analyzers, field)
            .with_fuzzy_max_edits(self.fuzzy_max_edits)
            .parse(text)
    }
}
