use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_WORDS_URL: &str = "https://www.listapalabras.com/palabras-con.php";
const DEFAULT_DICTIONARY_URL: &str = "https://dle.rae.es/data";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown output format '{0}': expected 'console' or 'chat'")]
    UnknownVariant(String),

    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Clone)]
struct Token(String);

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Runtime settings.
///
/// Read from the environment:
/// - `INVERSO_DATA_DIR`: where the JSON files live (default `data`)
/// - `INVERSO_WORDS_URL`: word-list endpoint
/// - `INVERSO_DICT_URL`: dictionary API base
/// - `INVERSO_DICT_TOKEN`: value sent as `Authorization: Basic <token>` (optional)
/// - `INVERSO_REQUEST_DELAY_MS`: pause before each remote request (default 0)
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub words_url: String,
    pub dictionary_url: String,
    dictionary_token: Option<Token>,
    pub request_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            words_url: DEFAULT_WORDS_URL.to_string(),
            dictionary_url: DEFAULT_DICTIONARY_URL.to_string(),
            dictionary_token: None,
            request_delay: Duration::ZERO,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let request_delay = match get("INVERSO_REQUEST_DELAY_MS") {
            Some(raw) => {
                let ms = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                    var: "INVERSO_REQUEST_DELAY_MS",
                    value: raw.clone(),
                })?;
                Duration::from_millis(ms)
            }
            None => defaults.request_delay,
        };

        Ok(Self {
            data_dir: get("INVERSO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            words_url: get("INVERSO_WORDS_URL").unwrap_or(defaults.words_url),
            dictionary_url: get("INVERSO_DICT_URL").unwrap_or(defaults.dictionary_url),
            dictionary_token: get("INVERSO_DICT_TOKEN").map(Token),
            request_delay,
        })
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn dictionary_token(&self) -> Option<&str> {
        self.dictionary_token.as_ref().map(|t| t.0.as_str())
    }

    pub fn paths(&self) -> CachePaths {
        CachePaths::new(&self.data_dir)
    }

    pub fn sessions_file(&self) -> PathBuf {
        self.data_dir.join("sessions.json")
    }
}

/// File layout of the cache under the data directory.
#[derive(Debug, Clone)]
pub struct CachePaths {
    pub words_file: PathBuf,
    pub definitions_file: PathBuf,
    /// Per-letter checkpoints written while a definitions refresh is in progress.
    pub letters_dir: PathBuf,
}

impl CachePaths {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            words_file: data_dir.join("words.json"),
            definitions_file: data_dir.join("definitions.json"),
            letters_dir: data_dir.join("definitions"),
        }
    }

    pub fn letter_file(&self, letter: &str) -> PathBuf {
        self.letters_dir.join(format!("{letter}.json"))
    }
}
