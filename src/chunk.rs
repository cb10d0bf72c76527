//! Fixed-window text splitter.
//!
//! Slides a character window across a document's full text, emitting
//! overlapping chunks in source order. The position of a chunk in the
//! returned sequence becomes its stored ordinal, so the output order is
//! load-bearing for vector-index alignment downstream.

/// Texts whose trimmed length falls below this are returned as one chunk.
const SHORT_TEXT_LIMIT: usize = 50;

/// Split text into overlapping fixed-size windows.
///
/// Each chunk is the window's content trimmed of surrounding whitespace;
/// windows that trim to nothing are dropped. The window advances by
/// `window_size - overlap` characters per step and the loop stops once a
/// window reaches the end of the text. A degenerate configuration where
/// `overlap >= window_size` cannot advance, so the loop stops after the
/// first window instead of spinning.
///
/// Operates on `char` boundaries throughout; slicing never lands inside a
/// multi-byte sequence.
pub fn split(text: &str, window_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().chars().count() < SHORT_TEXT_LIMIT {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let step = window_size.saturating_sub(overlap);

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let end = (start + window_size).min(len);
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end == len || step == 0 {
            break;
        }
        start += step;
    }

    chunks
}
