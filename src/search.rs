//! Reverse and direct lookups over a flattened word index.

use std::collections::HashMap;

use crate::corpus::{Corpus, WordEntry};
use crate::format::{Formatter, NOT_FOUND, Rendering};
use crate::normalize::flatten;

pub const DEFAULT_SEPARATOR: &str = " ";

struct IndexedEntry {
    entry: WordEntry,
    /// `entry.definitions` after [`flatten`], same order.
    flattened: Vec<String>,
}

impl IndexedEntry {
    fn new(word: &str, definitions: &[String]) -> Self {
        Self {
            entry: WordEntry::new(word, definitions.to_vec()),
            flattened: definitions
                .iter()
                .map(|d| flatten(d, DEFAULT_SEPARATOR))
                .collect(),
        }
    }

    fn mentions(&self, term: &str) -> bool {
        self.flattened.iter().any(|d| d.contains(term))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions<'a> {
    /// Splits the query into terms; `" "` when unset.
    pub separator: Option<&'a str>,
    /// Overrides the engine default for this query.
    pub include_definitions: Option<bool>,
    /// Return structured entries instead of formatted text.
    pub raw: bool,
}

/// Outcome of a direct lookup of a single word.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Rendering),
    NotFound,
}

impl Lookup {
    pub fn into_text(self) -> String {
        match self {
            Lookup::Found(rendering) => rendering.to_string(),
            Lookup::NotFound => NOT_FOUND.to_string(),
        }
    }
}

/// Word index rebuilt from a [`Corpus`] on every [`SearchEngine::set_corpus`].
///
/// Index order is corpus order. A word present under two letters keeps its
/// first position and the last definitions seen.
pub struct SearchEngine {
    entries: Vec<IndexedEntry>,
    positions: HashMap<String, usize>,
    include_definitions: bool,
    formatter: Formatter,
}

impl SearchEngine {
    pub fn new(corpus: &Corpus, formatter: Formatter) -> Self {
        let mut engine = Self {
            entries: Vec::new(),
            positions: HashMap::new(),
            include_definitions: false,
            formatter,
        };
        engine.set_corpus(corpus);
        engine
    }

    pub fn set_corpus(&mut self, corpus: &Corpus) {
        self.entries.clear();
        self.positions.clear();
        for (word, definitions) in corpus.entries() {
            let indexed = IndexedEntry::new(word, definitions);
            match self.positions.get(word) {
                Some(&i) => self.entries[i] = indexed,
                None => {
                    self.positions.insert(word.to_string(), self.entries.len());
                    self.entries.push(indexed);
                }
            }
        }
    }

    pub fn set_default_include_definitions(&mut self, include: bool) {
        self.include_definitions = include;
    }

    pub fn formatter(&self) -> Formatter {
        self.formatter
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, word: &str) -> Option<&WordEntry> {
        self.positions.get(word).map(|&i| &self.entries[i].entry)
    }

    /// Entries whose definitions mention every term of `query`.
    ///
    /// Terms are flattened and matched as substrings; each term may match a
    /// different definition of the same entry. An empty term (two separators in
    /// a row) matches any entry with at least one definition.
    pub fn matching_entries(&self, query: &str, separator: &str) -> Vec<&WordEntry> {
        let terms: Vec<String> = query
            .split(separator)
            .map(|t| flatten(t, DEFAULT_SEPARATOR))
            .collect();

        let mut candidates: Vec<usize> = (0..self.entries.len()).collect();
        for term in &terms {
            candidates.retain(|&i| self.entries[i].mentions(term));
            if candidates.is_empty() {
                break;
            }
        }
        candidates.into_iter().map(|i| &self.entries[i].entry).collect()
    }

    pub fn reverse_search(&self, query: &str, options: SearchOptions<'_>) -> Vec<Rendering> {
        let separator = options.separator.unwrap_or(DEFAULT_SEPARATOR);
        let include = options
            .include_definitions
            .unwrap_or(self.include_definitions);
        self.matching_entries(query, separator)
            .into_iter()
            .map(|entry| self.formatter.format_word(entry, include, options.raw))
            .collect()
    }

    /// Exact, case-sensitive lookup of a single word.
    ///
    /// Returns `None` when `query` holds more than one token; such queries are
    /// ignored rather than rejected.
    pub fn direct_lookup(&self, query: &str, separator: Option<&str>) -> Option<Lookup> {
        let separator = separator.unwrap_or(DEFAULT_SEPARATOR);
        if query.split(separator).count() != 1 {
            return None;
        }
        Some(match self.entry(query) {
            Some(entry) => Lookup::Found(self.formatter.format_word(entry, true, false)),
            None => Lookup::NotFound,
        })
    }
}
