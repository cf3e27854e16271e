//! Builds and persists the definitions corpus from the two sources.
//!
//! Words are listed per letter from the word source and stored in the words
//! file. Definitions are fetched letter by letter; each finished letter is
//! checkpointed to its own file so an interrupted run resumes at the first
//! unfinished letter. Once every letter is done the checkpoints are merged into
//! the definitions file and removed.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::CachePaths;
use crate::corpus::{Corpus, LETTERS, LetterDefinitions, WordList, is_letter};
use crate::normalize::first_letter;
use crate::sources::parser::{extract_definitions, extract_words};
use crate::sources::{DefinitionSource, SourceError, WordSource};
use crate::store::{self, StoreError};

/// What a refresh did. Source failures are counted, never propagated.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub words_refreshed: bool,
    pub definitions_refreshed: bool,
    /// Letters whose definitions were fetched in this run.
    pub letters_fetched: Vec<String>,
    /// Letters taken from checkpoints left by an earlier run.
    pub letters_resumed: Vec<String>,
    /// Letters or words that yielded no data because a source failed.
    pub failed_items: usize,
    pub persist_errors: Vec<StoreError>,
}

impl RefreshReport {
    pub fn is_clean(&self) -> bool {
        self.failed_items == 0 && self.persist_errors.is_empty()
    }
}

pub struct CacheManager<W, D> {
    word_source: W,
    definition_source: D,
    paths: CachePaths,
    words: WordList,
    corpus: Corpus,
}

impl<W: WordSource, D: DefinitionSource> CacheManager<W, D> {
    /// A manager with nothing loaded. Call [`CacheManager::initialize`] next.
    pub fn new(word_source: W, definition_source: D, paths: CachePaths) -> Self {
        Self {
            word_source,
            definition_source,
            paths,
            words: WordList::new(),
            corpus: Corpus::new(),
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn words(&self) -> &WordList {
        &self.words
    }

    pub fn paths(&self) -> &CachePaths {
        &self.paths
    }

    /// Load the persisted words and definitions, fetching whatever is missing
    /// or unreadable.
    pub async fn initialize(&mut self) -> RefreshReport {
        let (words_ok, definitions_ok) = self.load();
        self.refresh(!words_ok, !definitions_ok).await
    }

    /// Load whatever the cache files hold. Returns whether the words and the
    /// definitions were loaded.
    pub fn load(&mut self) -> (bool, bool) {
        let words_ok = match load_if_present::<WordList>(&self.paths.words_file) {
            Some(words) => {
                self.words = words;
                true
            }
            None => false,
        };
        let definitions_ok = match load_if_present::<Corpus>(&self.paths.definitions_file) {
            Some(corpus) => {
                self.corpus = corpus;
                true
            }
            None => false,
        };
        info!(
            words = self.words.values().map(BTreeSet::len).sum::<usize>(),
            definitions = self.corpus.definition_count(),
            "cache loaded"
        );
        (words_ok, definitions_ok)
    }

    /// Re-fetch the word list when forced or when its file is missing, then the
    /// definitions under the same rule.
    pub async fn refresh(&mut self, force_words: bool, force_definitions: bool) -> RefreshReport {
        let mut report = RefreshReport::default();

        if force_words || !self.paths.words_file.exists() {
            info!("downloading every word of the language");
            self.fetch_words(&mut report).await;
            report.words_refreshed = true;
        }

        if force_definitions || !self.paths.definitions_file.exists() {
            info!("collecting every definition of the language");
            self.fetch_definitions(&mut report).await;
            report.definitions_refreshed = true;
        }

        report
    }

    pub fn word_count(&self) -> usize {
        self.corpus.word_count()
    }

    pub fn definition_count(&self) -> usize {
        self.corpus.definition_count()
    }

    pub fn word_count_for(&self, letter: &str) -> usize {
        self.corpus.word_count_for(letter)
    }

    pub fn definition_count_for(&self, letter: &str) -> usize {
        self.corpus.definition_count_for(letter)
    }

    pub fn letter_with_most_words(&self) -> Option<&str> {
        self.corpus.letter_with_most_words()
    }

    async fn fetch_words(&mut self, report: &mut RefreshReport) {
        let mut words: WordList = LETTERS
            .iter()
            .map(|l| (l.to_string(), BTreeSet::new()))
            .collect();

        for letter in LETTERS {
            info!(letter, "listing words");
            let html = match self.word_source.list_words(letter).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(letter, code = e.code(), error = %e, "word listing failed");
                    report.failed_items += 1;
                    continue;
                }
            };
            for word in extract_words(&html) {
                match first_letter(&word).filter(|l| is_letter(l)) {
                    Some(bucket) => {
                        words.entry(bucket).or_default().insert(word);
                    }
                    None => debug!(%word, "skipping word outside the alphabet"),
                }
            }
        }

        persist(&self.paths.words_file, &words, report);
        self.words = words;
    }

    async fn fetch_definitions(&mut self, report: &mut RefreshReport) {
        let completed = self.completed_letters();
        let mut corpus = Corpus::new();

        for letter in LETTERS.iter().filter(|l| !completed.contains(**l)) {
            let definitions = self.fetch_letter(letter, report).await;
            corpus.insert_letter(*letter, definitions);
        }

        for letter in &completed {
            let checkpoint = self.paths.letter_file(letter);
            let definitions = match store::load::<LetterDefinitions>(&checkpoint) {
                Ok(definitions) => {
                    report.letters_resumed.push(letter.clone());
                    definitions
                }
                Err(e) => {
                    warn!(letter = %letter, error = %e, "checkpoint unreadable, fetching again");
                    self.fetch_letter(letter, report).await
                }
            };
            corpus.insert_letter(letter.clone(), definitions);
        }

        info!("serializing every definition");
        match store::save(&self.paths.definitions_file, &corpus) {
            Ok(()) => self.remove_checkpoints(),
            Err(e) => {
                warn!(error = %e, "definitions not saved; checkpoints kept");
                report.persist_errors.push(e);
            }
        }
        self.corpus = corpus;
    }

    /// Fetch definitions for every word of `letter` and checkpoint them.
    async fn fetch_letter(&self, letter: &str, report: &mut RefreshReport) -> LetterDefinitions {
        let empty = BTreeSet::new();
        let words = self.words.get(letter).unwrap_or(&empty);
        let total = words.len();
        let step = (total / 20).max(1);

        info!(letter, words = total, "downloading definitions");

        let mut definitions = LetterDefinitions::new();
        for (count, word) in words.iter().enumerate() {
            if count % step == 0 {
                info!(letter, "{count} of {total}");
            }
            let found = match self.fetch_word(word).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(%word, code = e.code(), error = %e, "definition fetch failed");
                    report.failed_items += 1;
                    Vec::new()
                }
            };
            definitions.insert(word.clone(), found);
        }

        info!(letter, "serializing letter definitions");
        persist(&self.paths.letter_file(letter), &definitions, report);
        report.letters_fetched.push(letter.to_string());
        definitions
    }

    /// Definitions of every dictionary entry matching `word`, concatenated.
    pub async fn fetch_word(&self, word: &str) -> Result<Vec<String>, SourceError> {
        let ids = self.definition_source.search_candidates(word).await?;
        let mut definitions = Vec::new();
        for id in ids {
            let body = self.definition_source.fetch_definition_body(&id).await?;
            definitions.extend(extract_definitions(Some(&body)));
        }
        Ok(definitions)
    }

    /// Letters with a checkpoint file on disk.
    fn completed_letters(&self) -> BTreeSet<String> {
        let Ok(entries) = fs::read_dir(&self.paths.letters_dir) else {
            return BTreeSet::new();
        };
        entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension()? != "json" {
                    return None;
                }
                let stem = path.file_stem()?.to_str()?;
                (stem.chars().count() == 1 && is_letter(stem)).then(|| stem.to_string())
            })
            .collect()
    }

    fn remove_checkpoints(&self) {
        for letter in LETTERS {
            let path = self.paths.letter_file(letter);
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "checkpoint removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove checkpoint"),
            }
        }
    }
}

fn load_if_present<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    if !path.exists() {
        info!(path = %path.display(), "no cache file yet");
        return None;
    }
    store::load(path)
        .inspect_err(|e| warn!(error = %e, "cache file unusable, rebuilding"))
        .ok()
}

fn persist<T: serde::Serialize>(path: &Path, value: &T, report: &mut RefreshReport) {
    if let Err(e) = store::save(path, value) {
        warn!(error = %e, "could not save");
        report.persist_errors.push(e);
    }
}
