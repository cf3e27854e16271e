//! Corpus data model: `letter → word → definitions`, the per-letter word list,
//! and the word entry handed to the formatter.

use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Alphabet the word source is queried with, in fetch order.
pub const LETTERS: [&str; 27] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "Ñ", "O", "P", "Q", "R",
    "S", "T", "U", "V", "W", "X", "Y", "Z",
];

pub fn is_letter(letter: &str) -> bool {
    LETTERS.contains(&letter)
}

/// Definitions of every word that starts with one letter.
pub type LetterDefinitions = BTreeMap<String, Vec<String>>;

/// Every known word, grouped by its uppercase first letter.
pub type WordList = BTreeMap<String, BTreeSet<String>>;

/// A word and its definitions in dictionary order.
///
/// Equality and hashing only look at `word`: two entries with the same word and
/// different definitions compare equal and collide in sets. The search index is
/// keyed by word and replaces whole entries, so this never merges definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    pub definitions: Vec<String>,
}

impl WordEntry {
    pub fn new(word: impl Into<String>, definitions: Vec<String>) -> Self {
        Self {
            word: word.into(),
            definitions,
        }
    }
}

impl PartialEq for WordEntry {
    fn eq(&self, other: &Self) -> bool {
        self.word == other.word
    }
}

impl Eq for WordEntry {}

impl Hash for WordEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.word.hash(state);
    }
}

/// In-memory definitions corpus.
///
/// Letters and words iterate in code-point order, so `Ñ` comes after `Z`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Corpus {
    letters: BTreeMap<String, LetterDefinitions>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_letter(&mut self, letter: impl Into<String>, words: LetterDefinitions) {
        self.letters.insert(letter.into(), words);
    }

    #[cfg(test)]
    pub fn letter(&self, letter: &str) -> Option<&LetterDefinitions> {
        self.letters.get(letter)
    }

    #[cfg(test)]
    pub fn letters(&self) -> impl Iterator<Item = (&str, &LetterDefinitions)> {
        self.letters.iter().map(|(l, w)| (l.as_str(), w))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.letters
            .values()
            .flat_map(|words| words.iter().map(|(w, d)| (w.as_str(), d.as_slice())))
    }

    pub fn word_count(&self) -> usize {
        self.letters.values().map(BTreeMap::len).sum()
    }

    pub fn word_count_for(&self, letter: &str) -> usize {
        self.letters.get(letter).map_or(0, BTreeMap::len)
    }

    pub fn definition_count(&self) -> usize {
        self.letters.values().map(count_definitions).sum()
    }

    pub fn definition_count_for(&self, letter: &str) -> usize {
        self.letters.get(letter).map_or(0, count_definitions)
    }

    /// Letter with the most words; ties go to the first letter in iteration order.
    pub fn letter_with_most_words(&self) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for (letter, words) in &self.letters {
            if best.is_none_or(|(_, n)| words.len() > n) {
                best = Some((letter.as_str(), words.len()));
            }
        }
        best.map(|(letter, _)| letter)
    }
}

fn count_definitions(words: &LetterDefinitions) -> usize {
    words.values().map(Vec::len).sum()
}

impl FromIterator<(String, LetterDefinitions)> for Corpus {
    fn from_iter<I: IntoIterator<Item = (String, LetterDefinitions)>>(iter: I) -> Self {
        Self {
            letters: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_corpus() -> Corpus {
    let mut e = LetterDefinitions::new();
    e.insert(
        "ebúrneo".into(),
        vec![
            "Blanco y liso, semejante al marfil.".into(),
            "Parecido al marfil.".into(),
        ],
    );
    e.insert(
        "ébano".into(),
        vec!["Árbol de madera negra, maciza y pesada.".into()],
    );
    let mut a = LetterDefinitions::new();
    a.insert("albo".into(), vec!["Blanco.".into()]);
    a.insert(
        "árbol".into(),
        vec![
            "Planta perenne, de tronco leñoso.".into(),
            "Estructura ramificada.".into(),
        ],
    );
    a.insert("aaronita".into(), Vec::new());
    let mut corpus = Corpus::new();
    corpus.insert_letter("A", a);
    corpus.insert_letter("E", e);
    corpus
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn word_entry_identity_is_the_word() {
        let a = WordEntry::new("albo", vec!["Blanco.".into()]);
        let b = WordEntry::new("albo", vec!["Otra cosa.".into()]);
        assert_eq!(a, b);
        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn counts_words_and_definitions() {
        let corpus = sample_corpus();
        assert_eq!(corpus.word_count(), 5);
        assert_eq!(corpus.word_count_for("A"), 3);
        assert_eq!(corpus.word_count_for("Z"), 0);
        assert_eq!(corpus.definition_count(), 6);
        assert_eq!(corpus.definition_count_for("E"), 3);
    }

    #[test]
    fn letter_with_most_words_picks_first_max() {
        let corpus = sample_corpus();
        assert_eq!(corpus.letter_with_most_words(), Some("A"));

        let tied: Corpus = [
            ("B".to_string(), LetterDefinitions::from([("boca".into(), Vec::new())])),
            ("C".to_string(), LetterDefinitions::from([("casa".into(), Vec::new())])),
        ]
        .into_iter()
        .collect();
        assert_eq!(tied.letter_with_most_words(), Some("B"));
    }

    #[test]
    fn empty_corpus_has_no_top_letter() {
        assert_eq!(Corpus::new().letter_with_most_words(), None);
        assert_eq!(Corpus::new().word_count(), 0);
    }

    #[test]
    fn letters_include_enye() {
        assert!(is_letter("Ñ"));
        assert!(!is_letter("1"));
        assert!(!is_letter("a"));
    }
}
