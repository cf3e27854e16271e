//! HTML extraction for the two sources.

use std::collections::BTreeSet;

use dom_query::Document;

/// Container of the result links on the word-list page.
const WORDS_SELECTOR: &str = "div#columna_resultados_generales a";
/// Definition paragraphs on a dictionary entry page.
const DEFINITIONS_SELECTOR: &str = "p.j";
/// Each definition starts with its number and abbreviation padding, e.g. `"1. "`.
const DEFINITION_PREFIX_CHARS: usize = 3;

/// Every listed word on a word-list page, trimmed. A page without the result
/// container yields an empty set.
pub fn extract_words(html: &str) -> BTreeSet<String> {
    let doc = Document::from(html);
    doc.select(WORDS_SELECTOR)
        .iter()
        .map(|a| a.text().trim().to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Definitions of a dictionary entry in page order, numbering stripped.
/// `None` (no entry) yields no definitions.
pub fn extract_definitions(html: Option<&str>) -> Vec<String> {
    let Some(html) = html else {
        return Vec::new();
    };
    let doc = Document::from(html);
    doc.select(DEFINITIONS_SELECTOR)
        .iter()
        .map(|p| p.text().chars().skip(DEFINITION_PREFIX_CHARS).collect())
        .collect()
}
