//! Text normalization shared by scoring and training.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid markup regex"));
static NON_TOKEN_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s\-]").expect("valid token regex"));

/// Minimal list of function words. Short domain terms (hiv, ice, aca, ...)
/// are deliberately not filtered.
pub const STOPWORDS: [&str; 27] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "as",
    "is", "was", "are", "were", "be", "been", "have", "has", "had", "do", "does", "did",
];

fn raw_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let stripped = MARKUP.replace_all(&lowered, " ");
    let cleaned = NON_TOKEN_CHARS.replace_all(&stripped, " ");

    cleaned
        .split_whitespace()
        .filter(|word| !word.is_empty() && !STOPWORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Unique tokens of `text`. Presence is all the scorer looks at.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    raw_tokens(text).into_iter().collect()
}

/// Occurrence count of every token in `text`, for training.
pub fn token_frequencies(text: &str) -> BTreeMap<String, u64> {
    let mut frequencies = BTreeMap::new();
    for token in raw_tokens(text) {
        *frequencies.entry(token).or_insert(0) += 1;
    }
    frequencies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_is_deterministic() {
        let text = "Wildfire smoke blankets the Pacific Northwest as drought deepens";
        assert_eq!(tokenize(text), tokenize(text));
    }

    #[test]
    fn test_tokenize_lowercases_and_dedups() {
        let tokens = tokenize("Carbon CARBON carbon emissions");
        assert_eq!(
            tokens.into_iter().collect::<Vec<_>>(),
            vec!["carbon".to_string(), "emissions".to_string()]
        );
    }

    #[test]
    fn test_tokenize_strips_markup_and_punctuation() {
        let tokens = tokenize("<p>Asylum <b>seekers</b> wait; officials say &quot;soon&quot;.</p>");
        assert!(tokens.contains("asylum"));
        assert!(tokens.contains("seekers"));
        assert!(tokens.contains("soon"));
        assert!(!tokens.iter().any(|t| t.contains('<') || t.contains(';')));
        assert!(!tokens.contains("p"));
    }

    #[test]
    fn test_tokenize_keeps_hyphens_and_short_terms() {
        let tokens = tokenize("Low-income families lose HIV and ACA coverage");
        assert!(tokens.contains("low-income"));
        assert!(tokens.contains("hiv"));
        assert!(tokens.contains("aca"));
        assert!(!tokens.contains("and"));
    }

    #[test]
    fn test_stopwords_and_punctuation_only_yield_nothing() {
        assert!(tokenize("The and of, to... is!!! was?").is_empty());
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \n\t ").is_empty());
    }

    #[test]
    fn test_token_frequencies_count_repeats() {
        let frequencies = token_frequencies("Wage theft: wage gaps and WAGE floors");
        assert_eq!(frequencies.get("wage"), Some(&3));
        assert_eq!(frequencies.get("theft"), Some(&1));
        assert_eq!(frequencies.get("and"), None);
    }
}
