use std::collections::{BTreeMap, BTreeSet};
use crate::core::error::Result;
use crate::core::types::DocId;
use crate::index::inverted::Term;
use crate::index::posting::{Posting, PostingList};
use crate::mvcc::controller::Snapshot;
use crate::query::ast::{BoolQuery, FuzzyQuery, Occur, PhraseQuery, PrefixQuery, Query, TermQuery};
use crate::scoring::scorer::{DocStats, Scorer};
use crate::search::fuzzy::FuzzyAutomaton;
use crate::search::results::{ScoredDocument, SearchResults, TopKCollector};

/// Matching documents with their score, ordered by DocId
type Matches = BTreeMap<DocId, f32>;

/// Evaluates a query tree against one snapshot
pub struct QueryExecutor<'a> {
    pub snapshot: &'a Snapshot,
    pub scorer: &'a dyn Scorer,
    pub fuzzy_max_expansions: usize,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(snapshot: &'a Snapshot, scorer: &'a dyn Scorer) -> Self {
        QueryExecutor {
            snapshot,
            scorer,
            fuzzy_max_expansions: 50,
        }
    }

    pub fn with_fuzzy_max_expansions(mut self, max_expansions: usize) -> Self {
        self.fuzzy_max_expansions = max_expansions;
        self
    }

    /// Top `limit` hits, best first; `total_hits` counts every match
    pub fn execute_query(&self, query: &Query, limit: usize) -> Result<SearchResults> {
        let mut collector = TopKCollector::new(limit);
        for (doc_id, score) in self.matches(query)? {
            collector.collect(ScoredDocument::new(doc_id, score));
        }
        Ok(collector.into_results())
    }

    pub fn matches(&self, query: &Query) -> Result<Matches> {
        match query {
            Query::Term(q) => Ok(self.execute_term(q)),
            Query::Phrase(q) => Ok(self.execute_phrase(q)),
            Query::Bool(q) => self.execute_bool(q),
            Query::Prefix(q) => Ok(self.execute_prefix(q)),
            Query::Fuzzy(q) => self.execute_fuzzy(q),
        }
    }

    fn score_postings(&self, field: &str, postings: &PostingList, weight: f32) -> Matches {
        let idf = self.scorer.idf(postings.doc_freq(), self.snapshot.num_docs());
        let avg_doc_length = self.snapshot.avg_field_length(field);
        postings.postings
            .iter()
            .map(|p| (p.doc_id, weight * self.score(p.term_freq as f32, idf, p, avg_doc_length)))
            .collect()
    }

    fn score(&self, term_freq: f32, idf: f32, posting: &Posting, avg_doc_length: f32) -> f32 {
        let stats = DocStats {
            doc_length: posting.field_length,
            avg_doc_length,
        };
        self.scorer.score(term_freq, idf, &stats)
    }

    fn execute_term(&self, query: &TermQuery) -> Matches {
        let postings = self.snapshot.postings(&Term::new(&query.field, &query.value));
        self.score_postings(&query.field, &postings, 1.0)
    }

    /// Union of expansions; a document matching several keeps its best score
    fn merge_max(into: &mut Matches, from: Matches) {
        for (doc_id, score) in from {
            into.entry(doc_id)
                .and_modify(|s| *s = s.max(score))
                .or_insert(score);
        }
    }

    fn execute_prefix(&self, query: &PrefixQuery) -> Matches {
        let mut matches = Matches::new();
        for text in self.snapshot.expand_prefix(&query.field, &query.prefix) {
            let postings = self.snapshot.postings(&Term::new(&query.field, &text));
            Self::merge_max(&mut matches, self.score_postings(&query.field, &postings, 1.0));
        }
        matches
    }

    fn execute_fuzzy(&self, query: &FuzzyQuery) -> Result<Matches> {
        let automaton = FuzzyAutomaton::new(&query.term, query.max_edits)?;

        // Closest terms first, then term order
        let mut candidates: Vec<(String, u8, f32)> = self.snapshot
            .expand_fuzzy(&query.field, &automaton)
            .into_iter()
            .map(|(text, distance)| {
                let weight = automaton.similarity(&text, distance);
                (text, distance, weight)
            })
            .filter(|(_, _, weight)| *weight > 0.0)
            .collect();
        candidates.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        candidates.truncate(self.fuzzy_max_expansions);

        let mut matches = Matches::new();
        for (text, _, weight) in candidates {
            let postings = self.snapshot.postings(&Term::new(&query.field, &text));
            Self::merge_max(&mut matches, self.score_postings(&query.field, &postings, weight));
        }
        Ok(matches)
    }

    fn execute_phrase(&self, query: &PhraseQuery) -> Matches {
        let mut matches = Matches::new();
        let Some(first) = query.terms.first() else {
            return matches;
        };

        let lists: Vec<PostingList> = query.terms
            .iter()
            .map(|t| self.snapshot.postings(&Term::new(&query.field, &t.text)))
            .collect();
        if lists.iter().any(PostingList::is_empty) {
            return matches;
        }

        // Candidates must contain every term
        let mut candidates: Vec<DocId> = lists[0].doc_ids().collect();
        for list in &lists[1..] {
            candidates.retain(|doc_id| list.get(*doc_id).is_some());
        }

        let total_docs = self.snapshot.num_docs();
        let idf: f32 = lists.iter()
            .map(|l| self.scorer.idf(l.doc_freq(), total_docs))
            .sum();
        let avg_doc_length = self.snapshot.avg_field_length(&query.field);

        for doc_id in candidates {
            let postings: Vec<&Posting> = lists.iter().filter_map(|l| l.get(doc_id)).collect();
            let freq = postings[0].positions
                .iter()
                .filter(|&&start| {
                    start >= first.position && query.terms.iter().zip(&postings).all(|(term, posting)| {
                        let expected = start - first.position + term.position;
                        posting.positions.binary_search(&expected).is_ok()
                    })
                })
                .count();

            if freq > 0 {
                matches.insert(doc_id, self.score(freq as f32, idf, postings[0], avg_doc_length));
            }
        }
        matches
    }

    fn execute_bool(&self, query: &BoolQuery) -> Result<Matches> {
        let mut required: Option<Matches> = None;
        for clause in query.clauses_with(Occur::Must) {
            let clause_matches = self.matches(clause)?;
            required = Some(match required {
                None => clause_matches,
                Some(acc) => acc.into_iter()
                    .filter_map(|(doc_id, score)| clause_matches.get(&doc_id).map(|s| (doc_id, score + s)))
                    .collect(),
            });
        }

        let mut optional = Matches::new();
        for clause in query.clauses_with(Occur::Should) {
            for (doc_id, score) in self.matches(clause)? {
                *optional.entry(doc_id).or_insert(0.0) += score;
            }
        }

        let mut excluded = BTreeSet::new();
        for clause in query.clauses_with(Occur::MustNot) {
            excluded.extend(self.matches(clause)?.into_keys());
        }

        // With required clauses, optional ones only add to the score.
        // Prohibited clauses alone match nothing.
        let mut matches = match required {
            Some(mut required) => {
                for (doc_id, score) in required.iter_mut() {
                    if let Some(extra) = optional.get(doc_id) {
                        *score += extra;
                    }
                }
                required
            }
            None => optional,
        };
        matches.retain(|doc_id, _| !excluded.contains(doc_id));
        Ok(matches)
    }
}
