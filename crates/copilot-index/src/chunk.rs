//! Word-window chunking.

/// Split `text` on whitespace into windows of `window` words.
///
/// Windows start every `stride` words (at least 1), so consecutive windows
/// overlap by `window - stride` words. Every window start before the end of
/// the text yields a chunk, which means the last few chunks can be shorter
/// than `window`. Empty text yields no chunks.
pub fn chunk_words(text: &str, window: usize, stride: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let window = window.max(1);
    let stride = stride.max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + window).min(words.len());
        chunks.push(words[start..end].join(" "));
        start += stride;
    }
    chunks
}
