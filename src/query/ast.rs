use std::fmt;
use serde::{Serialize, Deserialize};

/// Main query enum representing all query types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Term(TermQuery),         // Single term search
    Phrase(PhraseQuery),     // Exact phrase match
    Bool(BoolQuery),         // Boolean combinations
    Prefix(PrefixQuery),     // Terms starting with a prefix
    Fuzzy(FuzzyQuery),       // Typo tolerance
}

/// Single term query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub value: String,
}

/// Term of a phrase with its position relative to the first term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseTerm {
    pub text: String,
    pub position: u32,
}

/// Phrase query for exact phrase matching. Relative positions keep the gaps
/// left by removed stop words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseQuery {
    pub field: String,
    pub terms: Vec<PhraseTerm>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occur {
    Must,     // Required (AND, +)
    Should,   // Optional, contributes score
    MustNot,  // Excluded (NOT, -)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolClause {
    pub occur: Occur,
    pub query: Query,
}

/// Boolean query; clause order is kept as written
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoolQuery {
    pub clauses: Vec<BoolClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixQuery {
    pub field: String,
    pub prefix: String,
}

/// Fuzzy query implementation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyQuery {
    pub field: String,
    pub term: String,
    pub max_edits: u8,      // Damerau-Levenshtein distance, at most 2
}

impl Query {
    pub fn term(field: &str, value: &str) -> Self {
        Query::Term(TermQuery {
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    pub fn prefix(field: &str, prefix: &str) -> Self {
        Query::Prefix(PrefixQuery {
            field: field.to_string(),
            prefix: prefix.to_string(),
        })
    }

    pub fn fuzzy(field: &str, term: &str, max_edits: u8) -> Self {
        Query::Fuzzy(FuzzyQuery {
            field: field.to_string(),
            term: term.to_string(),
            max_edits,
        })
    }

    /// Phrase from `(text, position)` pairs; positions are made relative
    pub fn phrase(field: &str, terms: &[(String, u32)]) -> Self {
        let first = terms.first().map(|(_, p)| *p).unwrap_or(0);
        Query::Phrase(PhraseQuery {
            field: field.to_string(),
            terms: terms.iter()
                .map(|(text, position)| PhraseTerm {
                    text: text.clone(),
                    position: position - first,
                })
                .collect(),
        })
    }
}

impl BoolQuery {
    pub fn new() -> Self {
        BoolQuery {
            clauses: Vec::new(),
        }
    }

    pub fn add(&mut self, occur: Occur, query: Query) {
        self.clauses.push(BoolClause { occur, query });
    }

    pub fn with_must(mut self, query: Query) -> Self {
        self.add(Occur::Must, query);
        self
    }

    pub fn with_should(mut self, query: Query) -> Self {
        self.add(Occur::Should, query);
        self
    }

    pub fn with_must_not(mut self, query: Query) -> Self {
        self.add(Occur::MustNot, query);
        self
    }

    pub fn clauses_with(&self, occur: Occur) -> impl Iterator<Item = &Query> {
        self.clauses.iter().filter(move |c| c.occur == occur).map(|c| &c.query)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

// Lucene query syntax
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Query::Term(q) => write!(f, "{}:{}", q.field, q.value),
            Query::Prefix(q) => write!(f, "{}:{}*", q.field, q.prefix),
            Query::Fuzzy(q) => write!(f, "{}:{}~{}", q.field, q.term, q.max_edits),
            Query::Phrase(q) => {
                write!(f, "{}:\"", q.field)?;
                let mut next = 0;
                for (i, term) in q.terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    // a gap left by a removed token
                    while next < term.position {
                        f.write_str("? ")?;
                        next += 1;
                    }
                    f.write_str(&term.text)?;
                    next = term.position + 1;
                }
                f.write_str("\"")
            }
            Query::Bool(q) => {
                for (i, clause) in q.clauses.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    match clause.occur {
                        Occur::Must => f.write_str("+")?,
                        Occur::MustNot => f.write_str("-")?,
                        Occur::Should => {}
                    }
                    match &clause.query {
                        Query::Bool(_) => write!(f, "({})", clause.query)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let query = Query::Bool(
            BoolQuery::new()
                .with_must(Query::term("path", "a.txt"))
                .with_must(Query::term("content", "action"))
                .with_must_not(Query::Bool(
                    BoolQuery::new()
                        .with_should(Query::prefix("content", "luc"))
                        .with_should(Query::fuzzy("content", "lucene", 2)),
                )),
        );
        assert_eq!(
            query.to_string(),
            "+path:a.txt +content:action -(content:luc* content:lucene~2)"
        );
    }

    #[test]
    fn test_phrase_keeps_gaps() {
        let query = Query::phrase(
            "content",
            &[("lucene".to_string(), 4), ("action".to_string(), 6)],
        );
        assert_eq!(query.to_string(), "content:\"lucene ? action\"");
    }
}
