/// Number of whitespace-separated words in `text`
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Byte ranges of the whitespace-separated words of `text`
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(begin) = start.take() {
                spans.push((begin, idx));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(begin) = start {
        spans.push((begin, text.len()));
    }
    spans
}

/// Split text into overlapping windows of whitespace-separated words.
///
/// Every chunk is a verbatim slice of `text` from its first word to its last,
/// so line breaks inside a window survive. The caller guarantees
/// `overlap < window`.
pub fn chunk_words(text: &str, window: usize, overlap: usize) -> Vec<String> {
    let spans = word_spans(text);
    if spans.is_empty() || window == 0 {
        return Vec::new();
    }

    let step = window.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window).min(spans.len());
        chunks.push(text[spans[start].0..spans[end - 1].1].to_string());
        if end == spans.len() {
            break;
        }
        start += step;
    }
    chunks
}
