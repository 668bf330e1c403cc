use fst::{Automaton, IntoStreamer, Map, Streamer};
use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder, DFA, SINK_STATE};
use crate::core::error::{Error, Result};
use crate::index::inverted::Term;

pub const MAX_EDIT_DISTANCE: u8 = 2;

/// Damerau-Levenshtein automaton around a query term
pub struct FuzzyAutomaton {
    /// The target term to match
    term: String,

    /// Maximum allowed edit distance (0..=2)
    max_edit_distance: u8,

    dfa: DFA,
}

impl FuzzyAutomaton {
    pub fn new(term: &str, max_edit_distance: u8) -> Result<Self> {
        if max_edit_distance > MAX_EDIT_DISTANCE {
            return Err(Error::invalid_argument(format!(
                "max edit distance {} exceeds {}", max_edit_distance, MAX_EDIT_DISTANCE
            )));
        }

        // Transpositions count as one edit (teh -> the)
        let builder = LevenshteinAutomatonBuilder::new(max_edit_distance, true);
        Ok(Self {
            term: term.to_string(),
            max_edit_distance,
            dfa: builder.build_dfa(term),
        })
    }

    /// Edit distance to `candidate`, if within the bound
    pub fn distance(&self, candidate: &str) -> Option<u8> {
        match self.dfa.eval(candidate) {
            Distance::Exact(d) if d <= self.max_edit_distance => Some(d),
            _ => None,
        }
    }

    /// Relative similarity used to weight an expansion: 1 for an exact match,
    /// falling linearly with edits over the shorter of the two terms.
    pub fn similarity(&self, candidate: &str, distance: u8) -> f32 {
        let shorter = self.term.chars().count().min(candidate.chars().count());
        if distance == 0 {
            1.0
        } else if shorter == 0 {
            0.0
        } else {
            1.0 - distance as f32 / shorter as f32
        }
    }

    /// Terms of `field` within the edit bound, with distance and ordinal
    pub fn matching_terms(&self, dictionary: &Map<Vec<u8>>, field: &str) -> Vec<(String, u8, u32)> {
        let prefix = Term::field_prefix(field);
        let automaton = FieldScoped {
            prefix: &prefix,
            inner: DfaAutomaton(&self.dfa),
        };

        let mut results = Vec::new();
        let mut stream = dictionary.search(automaton).into_stream();
        while let Some((key, ordinal)) = stream.next() {
            let Ok(text) = std::str::from_utf8(&key[prefix.len()..]) else {
                continue;
            };
            if let Some(distance) = self.distance(text) {
                results.push((text.to_string(), distance, ordinal as u32));
            }
        }
        results
    }
}

/// Adapts the Levenshtein DFA to FST traversal
struct DfaAutomaton<'a>(&'a DFA);

impl Automaton for DfaAutomaton<'_> {
    type State = u32;

    fn start(&self) -> u32 {
        self.0.initial_state()
    }

    fn is_match(&self, state: &u32) -> bool {
        matches!(self.0.distance(*state), Distance::Exact(_))
    }

    fn can_match(&self, state: &u32) -> bool {
        *state != SINK_STATE
    }

    fn accept(&self, state: &u32, byte: u8) -> u32 {
        self.0.transition(*state, byte)
    }
}

#[derive(Clone, Debug)]
enum ScopedState<S> {
    Prefix(usize),
    Inner(S),
    Dead,
}

/// Requires keys to start with `prefix`, then runs `inner` on the rest
struct FieldScoped<'p, A> {
    prefix: &'p [u8],
    inner: A,
}

impl<A: Automaton> Automaton for FieldScoped<'_, A> {
    type State = ScopedState<A::State>;

    fn start(&self) -> Self::State {
        if self.prefix.is_empty() {
            ScopedState::Inner(self.inner.start())
        } else {
            ScopedState::Prefix(0)
        }
    }

    fn is_match(&self, state: &Self::State) -> bool {
        match state {
            ScopedState::Inner(s) => self.inner.is_match(s),
            _ => false,
        }
    }

    fn can_match(&self, state: &Self::State) -> bool {
        match state {
            ScopedState::Prefix(_) => true,
            ScopedState::Inner(s) => self.inner.can_match(s),
            ScopedState::Dead => false,
        }
    }

    fn accept(&self, state: &Self::State, byte: u8) -> Self::State {
        match state {
            ScopedState::Prefix(i) if self.prefix[*i] == byte => {
                if i + 1 == self.prefix.len() {
                    ScopedState::Inner(self.inner.start())
                } else {
                    ScopedState::Prefix(i + 1)
                }
            }
            ScopedState::Inner(s) => ScopedState::Inner(self.inner.accept(s, byte)),
            _ => ScopedState::Dead,
        }
    }
}
