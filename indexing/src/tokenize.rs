//! Query and document tokenization.
//!
//! Tokens are lowercase runs of `[a-z0-9_]`; everything else is a separator.
//! This is deliberately not linguistically correct, it only has to be cheap
//! and identical on both the query and document sides.

use std::collections::HashMap;

/// Split text into lowercase alphanumeric/underscore tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Count occurrences of each token.
pub fn term_frequency(tokens: &[String]) -> HashMap<String, usize> {
    let mut tf = HashMap::new();
    for tok in tokens {
        *tf.entry(tok.clone()).or_insert(0) += 1;
    }
    tf
}

/// Length-normalized keyword relevance of `text` for pre-tokenized query
/// tokens: the sum over query tokens of their frequency in the text divided
/// by the text's token count. Used by the keyword branches that score raw
/// records without a prebuilt index.
pub fn score_text(query_tokens: &[String], text: &str) -> f32 {
    let hay = tokenize(text);
    if hay.is_empty() {
        return 0.0;
    }
    let freq = term_frequency(&hay);
    let len = hay.len() as f32;
    query_tokens
        .iter()
        .map(|tok| freq.get(tok).copied().unwrap_or(0) as f32 / len)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_on_non_word_runs() {
        assert_eq!(
            tokenize("fn build_index(files: &[File]) -> Index"),
            vec!["fn", "build_index", "files", "file", "index"]
        );
    }

    #[test]
    fn lowercases_and_keeps_digits() {
        assert_eq!(tokenize("Base64 != base64"), vec!["base64", "base64"]);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert_eq!(tokenize("  \t\n--- "), Vec::<String>::new());
    }

    #[test]
    fn scores_by_normalized_frequency() {
        let q = tokenize("cache");
        // 1 hit in 4 tokens vs 2 hits in 4 tokens.
        assert!(score_text(&q, "the cache is warm") < score_text(&q, "cache cache is warm"));
        assert_eq!(score_text(&q, ""), 0.0);
        assert_eq!(score_text(&q, "nothing relevant here"), 0.0);
    }

    #[test]
    fn counts_term_frequency() {
        let tf = term_frequency(&tokenize("a b a c a b"));
        assert_eq!(tf.get("a"), Some(&3));
        assert_eq!(tf.get("b"), Some(&2));
        assert_eq!(tf.get("c"), Some(&1));
    }
}
