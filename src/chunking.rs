//! Character-window chunking with overlap.
//!
//! Splitting happens on `char` boundaries, not bytes, so multi-byte text is
//! always sliced safely. Each window is trimmed before it is emitted, and
//! windows that trim down to nothing are dropped entirely, which means runs
//! of whitespace can produce gaps in the output sequence.

/// Smallest window the chunker will operate with; `max_chars` is clamped up to this.
pub const MIN_CHUNK_CHARS: usize = 200;

/// Default window width used by ingestion.
pub const DEFAULT_MAX_CHARS: usize = 1200;

/// Default overlap between consecutive windows.
pub const DEFAULT_OVERLAP: usize = 150;

/// Splits `text` into overlapping windows of at most `max_chars` characters.
///
/// `max_chars` is clamped to at least [`MIN_CHUNK_CHARS`]; `overlap` is clamped
/// into `[0, max_chars / 2]` so the window always advances. The final window
/// may be shorter than `max_chars`. Empty or all-whitespace input yields an
/// empty vector.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let max_chars = max_chars.max(MIN_CHUNK_CHARS);
    let overlap = overlap.min(max_chars / 2);

    // Byte offsets of every char boundary, with the text length appended so
    // `boundaries[i]..boundaries[j]` slices the chars in positions i..j.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    boundaries.push(text.len());
    let total_chars = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < total_chars {
        let end = (start + max_chars).min(total_chars);
        let window = text[boundaries[start]..boundaries[end]].trim();
        if !window.is_empty() {
            chunks.push(window.to_string());
        }
        if end >= total_chars {
            break;
        }
        start = end - overlap;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("", 1000, 100).is_empty());
    }

    #[test]
    fn whitespace_only_input_yields_no_chunks() {
        assert!(chunk_text("   \n\t  \n  ", 1000, 100).is_empty());
    }

    #[test]
    fn long_run_splits_into_bounded_windows() {
        let text = "A".repeat(3000);
        let chunks = chunk_text(&text, 1000, 100);
        assert!(chunks.len() >= 3, "expected at least 3 chunks, got {}", chunks.len());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000);
        }
    }

    #[test]
    fn consecutive_windows_share_overlap() {
        let text: String = (0..1000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunk_text(&text, 600, 200);
        assert_eq!(chunks.len(), 2);
        // Window two starts 200 chars before window one ends.
        let tail_of_first: String = chunks[0].chars().skip(400).collect();
        let head_of_second: String = chunks[1].chars().take(200).collect();
        assert_eq!(tail_of_first, head_of_second);
    }

    #[test]
    fn more_overlap_never_produces_fewer_chunks() {
        let text = "word ".repeat(600);
        let mut previous = 0usize;
        for overlap in [0, 50, 100, 150] {
            let count = chunk_text(&text, 400, overlap).len();
            assert!(
                count >= previous,
                "overlap {overlap} produced {count} chunks, fewer than {previous}"
            );
            previous = count;
        }
    }

    #[test]
    fn whitespace_window_is_skipped() {
        // A run of spaces wide enough to fill an entire window on its own.
        let text = format!("{}{}{}", "x".repeat(200), " ".repeat(250), "y".repeat(200));
        let chunks = chunk_text(&text, 200, 0);
        assert!(chunks.iter().all(|chunk| !chunk.is_empty()));
        // The middle window trims to empty, so fewer chunks than windows.
        let windows = text.chars().count().div_ceil(200);
        assert!(chunks.len() < windows);
    }

    #[test]
    fn small_max_chars_is_clamped_up() {
        let text = "z".repeat(300);
        // Requesting 50-char windows still yields 200-char windows.
        let chunks = chunk_text(&text, 50, 0);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 200);
    }

    #[test]
    fn oversized_overlap_is_clamped_to_half_window() {
        let text = "q".repeat(800);
        // overlap 900 clamps to 200 for a 400-char window; step is 200.
        let chunks = chunk_text(&text, 400, 900);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn multibyte_text_slices_on_char_boundaries() {
        let text = "é".repeat(450);
        let chunks = chunk_text(&text, 200, 20);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 200);
            assert!(chunk.chars().all(|c| c == 'é'));
        }
    }
}
