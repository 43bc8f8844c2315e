use unicode_normalization::UnicodeNormalization;

/// Canonical identity of a search term or skill name: NFKD-decomposed with
/// every non-ASCII code point dropped, lowercased, and trimmed.
///
/// "Développeur ", "developpeur" and "DÉVELOPPEUR" all map to "developpeur".
/// Terms with no Latin letters at all ("日本語", "Русский") keep their own
/// script, lowercased and trimmed. Applying it twice is the same as applying it once.
pub fn normalize_term(raw: &str) -> String {
    let folded = raw
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string();
    if !folded.is_empty() {
        return folded;
    }
    raw.trim().to_lowercase()
}
