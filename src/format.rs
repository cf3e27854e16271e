//! Presentation of word entries for the console and for chat markup.

use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;
use crate::corpus::WordEntry;

/// Shown when a direct lookup misses.
pub const NOT_FOUND: &str = "No encuentro esa palabra.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputVariant {
    #[default]
    Console,
    /// HTML subset accepted by chat clients (`<b>`, `<i>`).
    Chat,
}

impl FromStr for OutputVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "chat" | "bot" => Ok(Self::Chat),
            _ => Err(ConfigError::UnknownVariant(s.to_string())),
        }
    }
}

/// A formatted search result.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendering {
    Text(String),
    /// Structured entry for callers that render it themselves.
    Entry(WordEntry),
    /// Bare word, structured mode without definitions.
    Word(String),
}

impl Rendering {
    /// The word this rendering is about, when it is structured.
    pub fn word(&self) -> Option<&str> {
        match self {
            Rendering::Text(_) => None,
            Rendering::Entry(entry) => Some(&entry.word),
            Rendering::Word(word) => Some(word),
        }
    }
}

impl fmt::Display for Rendering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rendering::Text(text) => f.write_str(text),
            Rendering::Entry(entry) => f.write_str(&entry.word),
            Rendering::Word(word) => f.write_str(word),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter {
    variant: OutputVariant,
}

impl Formatter {
    pub fn new(variant: OutputVariant) -> Self {
        Self { variant }
    }

    pub fn format_word(&self, entry: &WordEntry, include_definitions: bool, raw: bool) -> Rendering {
        match (raw, include_definitions) {
            (true, true) => Rendering::Entry(entry.clone()),
            (true, false) => Rendering::Word(entry.word.clone()),
            (false, false) => Rendering::Text(match self.variant {
                OutputVariant::Console => entry.word.clone(),
                OutputVariant::Chat => escape_html(&entry.word),
            }),
            (false, true) => Rendering::Text(match self.variant {
                OutputVariant::Console => console_entry(entry),
                OutputVariant::Chat => chat_entry(entry),
            }),
        }
    }
}

/// Word underlined with `=`, numbered definitions, and a closing rule as wide
/// as the last definition line.
fn console_entry(entry: &WordEntry) -> String {
    let mut last_len = entry.word.chars().count();
    let mut out = format!("\n{}\n{}\n", entry.word, "=".repeat(last_len));
    for (i, definition) in entry.definitions.iter().enumerate() {
        let line = format!("{}\t{definition}\n", i + 1);
        last_len = line.chars().count();
        out.push_str(&line);
    }
    out.push('\n');
    out.push_str(&"=".repeat(last_len));
    out.push('\n');
    out
}

fn chat_entry(entry: &WordEntry) -> String {
    let mut out = format!("<b>{}</b>\n", escape_html(&entry.word));
    for (i, definition) in entry.definitions.iter().enumerate() {
        out.push_str(&format!("<i>{}.</i> {}\n", i + 1, escape_html(definition)));
    }
    out
}

/// Escape the characters chat HTML parsing treats specially: `&`, `<`, `>`.
pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
