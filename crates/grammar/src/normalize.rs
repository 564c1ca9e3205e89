//! Transcript normalization
//!
//! Matching happens on a folded view (NFC, lowercase, stress marks
//! stripped) while every token keeps its byte offsets into the original
//! string, so corrections always quote the transcript verbatim.

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Combining acute accent, used as a stress mark in learner material.
const STRESS_MARK: char = '\u{0301}';

/// One word token of the transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Folded form used for matching.
    pub folded: String,
    /// Byte offset of the token start in the original string.
    pub start: usize,
    /// Byte offset one past the token end in the original string.
    pub end: usize,
}

/// Fold a string for matching: NFC compose, lowercase, strip stress marks.
pub fn fold(text: &str) -> String {
    text.nfc()
        .filter(|&c| c != STRESS_MARK)
        .flat_map(char::to_lowercase)
        .collect()
}

/// Fold and collapse internal whitespace; used for cache keys and
/// partial-transcript debouncing.
pub fn fold_for_key(text: &str) -> String {
    fold(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a transcript into word tokens with original byte offsets.
///
/// Punctuation and whitespace segments are dropped; sentence boundaries
/// are visible to detectors through the offset gaps.
pub fn tokenize(text: &str) -> Vec<Token> {
    text.split_word_bound_indices()
        .filter(|(_, word)| word.chars().any(char::is_alphanumeric))
        .map(|(start, word)| Token {
            folded: fold(word),
            start,
            end: start + word.len(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_lowercases_and_strips_stress() {
        assert_eq!(fold("Искам"), "искам");
        // Stressed "а" written as a + combining acute
        assert_eq!(fold("кога\u{0301}то"), "когато");
    }

    #[test]
    fn test_fold_for_key_collapses_whitespace() {
        assert_eq!(fold_for_key("  Искам   кафе \n"), "искам кафе");
    }

    #[test]
    fn test_tokenize_keeps_original_offsets() {
        let text = "Искам поръчвам кафе.";
        let tokens = tokenize(text);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].folded, "искам");
        assert_eq!(&text[tokens[0].start..tokens[0].end], "Искам");
        assert_eq!(&text[tokens[1].start..tokens[1].end], "поръчвам");
        assert_eq!(&text[tokens[2].start..tokens[2].end], "кафе");
    }

    #[test]
    fn test_tokenize_skips_punctuation() {
        let tokens = tokenize("Ами... да, добре!");
        let folded: Vec<&str> = tokens.iter().map(|t| t.folded.as_str()).collect();
        assert_eq!(folded, vec!["ами", "да", "добре"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ...  ").is_empty());
    }
}
