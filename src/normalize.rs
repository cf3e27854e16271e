/// Fold `text` for matching: lowercase, commas become `separator`, and the
/// Spanish accented vowels (plus `ü`) lose their diacritic.
///
/// Only á é í ó ú ü are stripped. `ñ` and any other accented character pass
/// through unchanged.
pub fn flatten(text: &str, separator: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        match c {
            ',' => out.push_str(separator),
            'á' => out.push('a'),
            'é' => out.push('e'),
            'í' => out.push('i'),
            'ó' => out.push('o'),
            'ú' | 'ü' => out.push('u'),
            _ => out.push(c),
        }
    }
    out
}

/// Uppercase first letter of `word` after flattening, used as the corpus bucket.
pub fn first_letter(word: &str) -> Option<String> {
    flatten(word, " ")
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
}
