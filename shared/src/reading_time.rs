//! Reading-time estimate for post bodies.

use crate::{rich_text, PostSection};

/// Average reading speed used for estimates.
pub const WORDS_PER_MINUTE: usize = 200;

/// Whitespace-separated words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Words in every heading plus its flattened body, divided by
/// [`WORDS_PER_MINUTE`] and rounded up. Empty content is 0 minutes.
pub fn estimate_reading_time(content: &[PostSection]) -> u32 {
    let words: usize = content
        .iter()
        .map(|section| {
            count_words(&section.heading) + count_words(&rich_text::as_text(&section.body))
        })
        .sum();
    words.div_ceil(WORDS_PER_MINUTE) as u32
}
