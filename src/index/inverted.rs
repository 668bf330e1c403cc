use std::collections::{BTreeMap, HashMap};
use std::fmt;
use fst::MapBuilder;
use crate::analysis::token::Token;
use crate::core::error::{Error, Result};
use crate::core::types::Document;
use crate::index::posting::PostingRecord;
use crate::storage::segment::SegmentData;

const KEY_SEPARATOR: u8 = 0;

/// A token bound to the field it was indexed under.
///
/// Ordering is (field, text), which matches the byte order of the encoded
/// dictionary key because field names never contain NUL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term {
    pub field: String,
    pub text: String,
}

impl Term {
    pub fn new(field: &str, text: &str) -> Self {
        Term {
            field: field.to_string(),
            text: text.to_string(),
        }
    }

    /// Dictionary key: `field \0 text`
    pub fn key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.field.len() + 1 + self.text.len());
        key.extend_from_slice(self.field.as_bytes());
        key.push(KEY_SEPARATOR);
        key.extend_from_slice(self.text.as_bytes());
        key
    }

    pub fn from_key(key: &[u8]) -> Result<Self> {
        let split = key
            .iter()
            .position(|&b| b == KEY_SEPARATOR)
            .ok_or_else(|| Error::corruption("term key without field separator"))?;
        let field = std::str::from_utf8(&key[..split])
            .map_err(|_| Error::corruption("invalid UTF-8 in term field"))?;
        let text = std::str::from_utf8(&key[split + 1..])
            .map_err(|_| Error::corruption("invalid UTF-8 in term"))?;
        Ok(Term::new(field, text))
    }

    /// Key prefix shared by every term of `field`
    pub fn field_prefix(field: &str) -> Vec<u8> {
        let mut prefix = field.as_bytes().to_vec();
        prefix.push(KEY_SEPARATOR);
        prefix
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.text)
    }
}

#[derive(Debug, Clone)]
struct PendingPosting {
    doc: u32,
    positions: Vec<u32>,
}

/// In-memory inverted index for one segment under construction.
///
/// Documents are numbered in insertion order. `build` freezes everything into
/// the on-disk `SegmentData` layout: an FST term dictionary, a fixed-size
/// posting arena and a positions arena.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: BTreeMap<Term, Vec<PendingPosting>>,
    documents: Vec<Document>,
    field_lengths: BTreeMap<String, Vec<u32>>,
    total_tokens: u64,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn doc_count(&self) -> u32 {
        self.documents.len() as u32
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    /// Add a document with its analyzed fields. Returns the local ordinal.
    pub fn add_document(&mut self, stored: Document, fields: &[(String, Vec<Token>)]) -> u32 {
        let lengths = fields
            .iter()
            .map(|(field, tokens)| (field.clone(), tokens.len() as u32))
            .collect();
        let doc = self.append_document(stored, lengths);

        for (field, tokens) in fields {
            let mut term_positions: HashMap<&str, Vec<u32>> = HashMap::new();
            for token in tokens {
                term_positions.entry(token.text.as_str())
                    .or_default()
                    .push(token.position);
            }
            for (text, positions) in term_positions {
                self.add_posting(Term::new(field, text), doc, positions);
            }
        }
        doc
    }

    /// Register stored fields and field lengths without postings. Used when
    /// copying documents from existing segments.
    pub fn append_document(&mut self, stored: Document, lengths: BTreeMap<String, u32>) -> u32 {
        let doc = self.documents.len() as u32;
        self.documents.push(stored);
        for (field, length) in lengths {
            let column = self.field_lengths.entry(field).or_default();
            column.resize(doc as usize, 0);
            column.push(length);
            self.total_tokens += length as u64;
        }
        doc
    }

    pub fn add_posting(&mut self, term: Term, doc: u32, mut positions: Vec<u32>) {
        positions.sort_unstable();
        self.postings
            .entry(term)
            .or_default()
            .push(PendingPosting { doc, positions });
    }

    pub fn build(self) -> Result<SegmentData> {
        let doc_count = self.documents.len();
        let mut dictionary = MapBuilder::memory();
        let mut term_postings = Vec::with_capacity(self.postings.len());
        let mut postings = Vec::new();
        let mut positions = Vec::new();

        for (ordinal, (term, mut pending)) in self.postings.into_iter().enumerate() {
            dictionary.insert(term.key(), ordinal as u64)?;
            pending.sort_by_key(|p| p.doc);

            term_postings.push((postings.len() as u32, pending.len() as u32));
            for posting in pending {
                postings.push(PostingRecord {
                    doc: posting.doc,
                    term_freq: posting.positions.len() as u32,
                    positions_start: positions.len() as u32,
                });
                positions.extend(posting.positions);
            }
        }

        let mut field_lengths = self.field_lengths;
        for column in field_lengths.values_mut() {
            column.resize(doc_count, 0);
        }

        Ok(SegmentData {
            documents: self.documents,
            term_dict: dictionary.into_inner()?,
            term_postings,
            postings,
            positions,
            field_lengths,
        })
    }
}
