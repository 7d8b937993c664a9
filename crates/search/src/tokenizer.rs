use unicode_segmentation::UnicodeSegmentation;

/// Split text into lowercase word tokens.
///
/// Word boundaries follow Unicode segmentation rules, so punctuation and
/// whitespace never produce tokens. No stemming or stopword removal.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}
