//! Recursive descent parser for the Lucene classic query syntax
//!
//! ```text
//! query    := clause* with optional AND / OR between clauses
//! clause   := modifier? (TERM ':')? value
//! modifier := '+' | '-' | NOT
//! value    := TERM ('*' | '~' N?)? | PHRASE | '(' query ')'
//! ```
//!
//! The default operator is OR. `AND` makes both neighbours required, `+`
//! and `-` mark single clauses.

use crate::analysis::analyzer::FieldAnalyzers;
use crate::core::error::{Error, Result};
use crate::query::ast::{BoolClause, BoolQuery, Occur, Query};
use crate::query::lexer::{Lexer, Spanned, Token};
use crate::search::fuzzy::MAX_EDIT_DISTANCE;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Conjunction {
    None,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modifier {
    None,
    Required,
    Prohibited,
}

/// Query parser for converting string queries to AST
pub struct QueryParser<'a> {
    analyzers: &'a FieldAnalyzers,
    default_field: String,
    fuzzy_max_edits: u8,
}

/// Token cursor over one input
struct Cursor {
    tokens: Vec<Spanned>,
    position: usize,
    input: Vec<char>,
}

impl Cursor {
    fn peek(&self) -> &Token {
        &self.tokens[self.position].token
    }

    fn next(&mut self) -> Spanned {
        let token = self.tokens[self.position].clone();
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    /// Span of the token consumed before the current one
    fn previous(&self) -> Option<&Spanned> {
        self.position.checked_sub(1).map(|p| &self.tokens[p])
    }

    fn fragment(&self, start: usize, end: usize) -> String {
        self.input[start..end.min(self.input.len())].iter().collect()
    }

    fn error(&self, span: &Spanned, reason: &str) -> Error {
        Error::query_syntax(self.fragment(span.start, span.end), reason)
    }

    /// Error at end of input, pointing at what dangles before it
    fn dangling(&self, reason: &str) -> Error {
        match self.previous() {
            Some(span) => self.error(span, reason),
            None => Error::query_syntax("", reason),
        }
    }
}

impl<'a> QueryParser<'a> {
    pub fn new(analyzers: &'a FieldAnalyzers, default_field: &str) -> Self {
        QueryParser {
            analyzers,
            default_field: default_field.to_string(),
            fuzzy_max_edits: MAX_EDIT_DISTANCE,
        }
    }

    /// Edit distance for `term~` without an explicit number
    pub fn with_fuzzy_max_edits(mut self, max_edits: u8) -> Self {
        self.fuzzy_max_edits = max_edits.min(MAX_EDIT_DISTANCE);
        self
    }

    pub fn parse(&self, input: &str) -> Result<Query> {
        if input.trim().is_empty() {
            return Err(Error::query_syntax(input, "Empty query"));
        }

        let mut cursor = Cursor {
            tokens: Lexer::new(input).tokenize()?,
            position: 0,
            input: input.chars().collect(),
        };

        let clauses = self.parse_clauses(&mut cursor, &self.default_field)?;
        let end = cursor.next();
        match end.token {
            Token::Eof => Ok(combine(clauses)),
            _ => Err(cursor.error(&end, "Unbalanced closing parenthesis")),
        }
    }

    fn parse_clauses(&self, cursor: &mut Cursor, field: &str) -> Result<Vec<BoolClause>> {
        let mut clauses = Vec::new();
        let mut first = true;

        loop {
            if matches!(cursor.peek(), Token::Eof | Token::RightParen) {
                return Ok(clauses);
            }

            let conjunction = match cursor.peek() {
                Token::And | Token::Or if first => {
                    let span = cursor.next();
                    return Err(cursor.error(&span, "Operator without left operand"));
                }
                Token::And => {
                    cursor.next();
                    Conjunction::And
                }
                Token::Or => {
                    cursor.next();
                    Conjunction::Or
                }
                _ => Conjunction::None,
            };

            let modifier = match cursor.peek() {
                Token::Plus => {
                    cursor.next();
                    Modifier::Required
                }
                Token::Minus | Token::Not => {
                    cursor.next();
                    Modifier::Prohibited
                }
                _ => Modifier::None,
            };

            let query = self.parse_clause(cursor, field)?;
            add_clause(&mut clauses, conjunction, modifier, query);
            first = false;
        }
    }

    /// One clause; `None` when its text analyzes to nothing
    fn parse_clause(&self, cursor: &mut Cursor, field: &str) -> Result<Option<Query>> {
        let token = cursor.next();
        match &token.token {
            Token::Term(name) if *cursor.peek() == Token::Colon => {
                cursor.next();
                let value = cursor.next();
                match value.token {
                    Token::LeftParen => self.parse_group(cursor, name, &value),
                    Token::Term(_) | Token::Phrase(_) => self.parse_value(cursor, name, value),
                    _ => Err(Error::query_syntax(
                        cursor.fragment(token.start, value.start),
                        "Missing value after field",
                    )),
                }
            }
            Token::LeftParen => self.parse_group(cursor, field, &token),
            Token::Term(_) | Token::Phrase(_) => self.parse_value(cursor, field, token.clone()),
            Token::Eof => Err(cursor.dangling("Missing operand")),
            _ => Err(cursor.error(&token, "Unexpected token")),
        }
    }

    fn parse_group(&self, cursor: &mut Cursor, field: &str, open: &Spanned) -> Result<Option<Query>> {
        let nothing_inside = *cursor.peek() == Token::RightParen;
        let clauses = self.parse_clauses(cursor, field)?;
        let close = cursor.next();
        match close.token {
            Token::RightParen if nothing_inside => {
                Err(Error::query_syntax(cursor.fragment(open.start, close.end), "Empty group"))
            }
            Token::RightParen => Ok(Some(combine(clauses))),
            _ => Err(Error::query_syntax(
                cursor.fragment(open.start, close.end),
                "Missing closing parenthesis",
            )),
        }
    }

    fn parse_value(&self, cursor: &mut Cursor, field: &str, value: Spanned) -> Result<Option<Query>> {
        match value.token {
            Token::Term(text) => match *cursor.peek() {
                Token::Asterisk => {
                    cursor.next();
                    let prefix = self.analyzers.normalize(field, &text);
                    Ok(Some(Query::prefix(field, &prefix)))
                }
                Token::Tilde(distance) => {
                    let tilde = cursor.next();
                    let max_edits = match distance {
                        None => self.fuzzy_max_edits,
                        Some(d) if d <= MAX_EDIT_DISTANCE as u32 => d as u8,
                        Some(_) => {
                            return Err(Error::query_syntax(
                                cursor.fragment(value.start, tilde.end),
                                "Edit distance must be at most 2",
                            ));
                        }
                    };
                    let term = self.analyzers.normalize(field, &text);
                    Ok(Some(Query::fuzzy(field, &term, max_edits)))
                }
                _ => Ok(self.analyzed_term(field, &text)),
            },
            Token::Phrase(text) => {
                if let Token::Tilde(_) = cursor.peek() {
                    let tilde = cursor.next();
                    return Err(Error::query_syntax(
                        cursor.fragment(value.start, tilde.end),
                        "Proximity search is not supported",
                    ));
                }
                Ok(self.analyzed_phrase(field, &text))
            }
            _ => Err(cursor.error(&value, "Expected a term or phrase")),
        }
    }

    /// A bare word may analyze to several tokens (`a.txt` -> `txt`,
    /// `foo-bar` -> `foo bar`); each becomes an optional clause.
    fn analyzed_term(&self, field: &str, text: &str) -> Option<Query> {
        let mut terms = self.analyzers.terms(field, text);
        match terms.len() {
            0 => None,
            1 => terms.pop().map(|t| Query::term(field, &t)),
            _ => {
                let mut query = BoolQuery::new();
                for term in terms {
                    query.add(Occur::Should, Query::term(field, &term));
                }
                Some(Query::Bool(query))
            }
        }
    }

    fn analyzed_phrase(&self, field: &str, text: &str) -> Option<Query> {
        let tokens = self.analyzers.tokenize(field, text);
        match tokens.len() {
            0 => None,
            1 => Some(Query::term(field, &tokens[0].text)),
            _ => {
                let terms: Vec<(String, u32)> = tokens.into_iter()
                    .map(|t| (t.text, t.position))
                    .collect();
                Some(Query::phrase(field, &terms))
            }
        }
    }
}

/// Fold a clause into the list the way Lucene's classic parser does with
/// OR as the default operator.
fn add_clause(
    clauses: &mut Vec<BoolClause>,
    conjunction: Conjunction,
    modifier: Modifier,
    query: Option<Query>,
) {
    // `a AND b` also makes `a` required, unless it is prohibited
    if conjunction == Conjunction::And {
        if let Some(last) = clauses.last_mut() {
            if last.occur != Occur::MustNot {
                last.occur = Occur::Must;
            }
        }
    }

    let Some(query) = query else {
        return;
    };

    let occur = match modifier {
        Modifier::Prohibited => Occur::MustNot,
        Modifier::Required => Occur::Must,
        Modifier::None if conjunction == Conjunction::And => Occur::Must,
        Modifier::None => Occur::Should,
    };
    clauses.push(BoolClause { occur, query });
}

fn combine(mut clauses: Vec<BoolClause>) -> Query {
    if clauses.len() == 1 && clauses[0].occur != Occur::MustNot {
        if let Some(clause) = clauses.pop() {
            return clause.query;
        }
    }
    Query::Bool(BoolQuery { clauses })
}
