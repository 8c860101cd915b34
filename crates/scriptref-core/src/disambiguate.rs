//! Digit-run disambiguation
//!
//! Annotation sources often lose the separator between a source verse and the
//! first reference of its note: `1.315.41` is really verse `1.31` followed by
//! `5.41`. The split is recovered by taking the longest digit prefix that is
//! a valid verse number for the chapter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Verse ceiling for chapters missing from a [`VerseCounts`] table.
pub const DEFAULT_MAX_VERSE: u32 = 60;

const MARK_VERSE_COUNTS: [u32; 16] = [45, 28, 35, 41, 43, 56, 37, 38, 50, 52, 33, 44, 37, 72, 47, 20];

/// Maximum verse number per chapter of one book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerseCounts {
    chapters: BTreeMap<u32, u32>,
}

impl VerseCounts {
    pub fn new(chapters: BTreeMap<u32, u32>) -> Self {
        Self { chapters }
    }

    /// Verse counts of the Gospel of Mark (16 chapters).
    pub fn mark() -> Self {
        MARK_VERSE_COUNTS
            .iter()
            .enumerate()
            .map(|(i, &count)| (i as u32 + 1, count))
            .collect()
    }

    /// Highest valid verse of `chapter`, or [`DEFAULT_MAX_VERSE`].
    pub fn max_verse(&self, chapter: u32) -> u32 {
        self.chapters
            .get(&chapter)
            .copied()
            .unwrap_or(DEFAULT_MAX_VERSE)
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }
}

impl FromIterator<(u32, u32)> for VerseCounts {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A verse number guessed from a digit run.
///
/// This is a heuristic result. It keeps the digits it consumed so callers
/// can split the remaining text off the original run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseGuess {
    digits: String,
    verse: u32,
}

impl VerseGuess {
    pub fn verse(&self) -> u32 {
        self.verse
    }

    /// Digits consumed from the run, as written (`"05"` stays `"05"`).
    pub fn as_str(&self) -> &str {
        &self.digits
    }

    /// Byte length of the consumed prefix.
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }
}

/// Longest prefix of `digits` that is a valid verse number of `chapter`.
///
/// Candidates shrink one character at a time from the right until one parses
/// and falls inside `[1, max_verse]`.
pub fn longest_valid_verse(digits: &str, chapter: u32, counts: &VerseCounts) -> Option<VerseGuess> {
    let max = counts.max_verse(chapter);
    (1..=digits.len())
        .rev()
        .filter(|&end| digits.is_char_boundary(end))
        .find_map(|end| {
            let candidate = &digits[..end];
            match candidate.parse::<u32>() {
                Ok(verse) if (1..=max).contains(&verse) => Some(VerseGuess {
                    digits: candidate.to_string(),
                    verse,
                }),
                _ => None,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_table() {
        let mark = VerseCounts::mark();
        assert_eq!(mark.len(), 16);
        assert_eq!(mark.max_verse(1), 45);
        assert_eq!(mark.max_verse(14), 72);
        assert_eq!(mark.max_verse(16), 20);
        assert_eq!(mark.max_verse(17), DEFAULT_MAX_VERSE);
    }

    #[test]
    fn test_run_on_digits_split() {
        let mark = VerseCounts::mark();
        let guess = longest_valid_verse("315", 1, &mark).unwrap();
        assert_eq!(guess.as_str(), "31");
        assert_eq!(guess.verse(), 31);
        assert_eq!(guess.len(), 2);
    }

    #[test]
    fn test_full_run_kept_when_valid() {
        let mark = VerseCounts::mark();
        assert_eq!(longest_valid_verse("45", 1, &mark).unwrap().verse(), 45);
        assert_eq!(longest_valid_verse("72", 14, &mark).unwrap().verse(), 72);
    }

    #[test]
    fn test_chapter_bound_applies() {
        let mark = VerseCounts::mark();
        // 46 exceeds chapter 1, so only "4" is left
        assert_eq!(longest_valid_verse("46", 1, &mark).unwrap().verse(), 4);
        // 28 is the last verse of chapter 2
        assert_eq!(longest_valid_verse("2812", 2, &mark).unwrap().verse(), 28);
    }

    #[test]
    fn test_unknown_chapter_uses_default_ceiling() {
        let counts = VerseCounts::default();
        assert_eq!(longest_valid_verse("605", 3, &counts).unwrap().verse(), 60);
        assert_eq!(longest_valid_verse("615", 3, &counts).unwrap().verse(), 6);
    }

    #[test]
    fn test_no_valid_prefix() {
        let mark = VerseCounts::mark();
        assert_eq!(longest_valid_verse("", 1, &mark), None);
        assert_eq!(longest_valid_verse("0", 1, &mark), None);
        assert_eq!(longest_valid_verse("x1", 1, &mark), None);
    }

    #[test]
    fn test_leading_zero_is_kept_in_digits() {
        let mark = VerseCounts::mark();
        let guess = longest_valid_verse("05", 1, &mark).unwrap();
        assert_eq!(guess.as_str(), "05");
        assert_eq!(guess.verse(), 5);
    }

    #[test]
    fn test_counts_from_toml_like_map() {
        let counts: VerseCounts = serde_json::from_str(r#"{"1": 10, "2": 5}"#).unwrap();
        assert_eq!(counts.max_verse(1), 10);
        assert_eq!(counts.max_verse(2), 5);
        assert_eq!(longest_valid_verse("12", 1, &counts).unwrap().verse(), 1);
    }
}
