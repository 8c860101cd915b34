//! Reference parsing
//!
//! Turns loosely formatted human references ("Mc 1:1", "1 Co 8.12", "Gn 1",
//! "Jean 3,16") into canonical addresses, using a [`Registry`] for book
//! resolution.
//!
//! # Example
//!
//! ```
//! use scriptref_core::{ReferenceParser, Registry};
//!
//! let registry = Registry::bundled();
//! let parser = ReferenceParser::new(&registry);
//!
//! let reference = parser.normalize("1 Co 8:12").unwrap();
//! assert_eq!(reference.canonical, "1CO.8.12");
//! assert!(parser.normalize("InvalidBook 1:1").is_none());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::registry::Registry;

// ============================================================================
// Addresses
// ============================================================================

/// Error parsing a canonical address or relation target string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address '{0}' must have the form BOOK.CHAPTER[.VERSE]")]
    Shape(String),

    #[error("address '{0}' has a non-numeric or zero chapter")]
    Chapter(String),

    #[error("address '{0}' has a non-numeric verse")]
    Verse(String),
}

/// A canonical `(book, chapter, verse)` address.
///
/// `verse == 0` designates the whole chapter. Ordering across books needs a
/// [`Registry`]; see [`Registry::compare`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalAddress {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
}

impl CanonicalAddress {
    pub fn new(book: impl Into<String>, chapter: u32, verse: u32) -> Self {
        Self {
            book: book.into(),
            chapter,
            verse,
        }
    }

    /// Whole-chapter address.
    pub fn chapter(book: impl Into<String>, chapter: u32) -> Self {
        Self::new(book, chapter, 0)
    }

    pub fn is_whole_chapter(&self) -> bool {
        self.verse == 0
    }
}

impl fmt::Display for CanonicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.verse == 0 {
            write!(f, "{}.{}", self.book, self.chapter)
        } else {
            write!(f, "{}.{}.{}", self.book, self.chapter, self.verse)
        }
    }
}

impl FromStr for CanonicalAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if !(2..=3).contains(&parts.len()) || parts[0].is_empty() {
            return Err(AddressParseError::Shape(s.to_string()));
        }
        let chapter = parts[1]
            .parse::<u32>()
            .ok()
            .filter(|&c| c > 0)
            .ok_or_else(|| AddressParseError::Chapter(s.to_string()))?;
        let verse = match parts.get(2) {
            Some(v) => v
                .parse::<u32>()
                .map_err(|_| AddressParseError::Verse(s.to_string()))?,
            None => 0,
        };
        Ok(Self::new(parts[0], chapter, verse))
    }
}

/// End of a verse range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RangeEnd {
    /// Bare end verse in the start's book and chapter (`MRK.8.29-30`)
    Verse(u32),
    /// Full end address (`MRK.8.29-MRK.9.1`)
    Address(CanonicalAddress),
}

/// Target of a stored relation: a single address or a range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationTarget {
    pub start: CanonicalAddress,
    pub end: Option<RangeEnd>,
}

impl RelationTarget {
    pub fn single(start: CanonicalAddress) -> Self {
        Self { start, end: None }
    }

    pub fn range(start: CanonicalAddress, end: RangeEnd) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn is_range(&self) -> bool {
        self.end.is_some()
    }

    pub fn book(&self) -> &str {
        &self.start.book
    }
}

impl fmt::Display for RelationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)?;
        match &self.end {
            None => Ok(()),
            Some(RangeEnd::Verse(v)) => write!(f, "-{v}"),
            Some(RangeEnd::Address(a)) => write!(f, "-{a}"),
        }
    }
}

impl FromStr for RelationTarget {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((start, end)) = s.split_once('-') else {
            return Ok(Self::single(s.parse()?));
        };
        let start: CanonicalAddress = start.parse()?;
        let end = if end.contains('.') {
            RangeEnd::Address(end.parse()?)
        } else {
            RangeEnd::Verse(
                end.parse()
                    .map_err(|_| AddressParseError::Verse(s.to_string()))?,
            )
        };
        Ok(Self::range(start, end))
    }
}

impl Serialize for RelationTarget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RelationTarget {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Result of normalizing a human reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedRef {
    pub book_code: String,
    pub chapter: u32,
    /// 0 for chapter-only references
    pub verse: u32,
    /// `BOOK.C.V`, or `BOOK.C` when `verse == 0`
    pub canonical: String,
}

impl NormalizedRef {
    pub fn new(book_code: impl Into<String>, chapter: u32, verse: u32) -> Self {
        let address = CanonicalAddress::new(book_code, chapter, verse);
        let canonical = address.to_string();
        Self {
            book_code: address.book,
            chapter,
            verse,
            canonical,
        }
    }

    pub fn address(&self) -> CanonicalAddress {
        CanonicalAddress::new(self.book_code.clone(), self.chapter, self.verse)
    }
}

impl fmt::Display for NormalizedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Parses human references against a registry.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceParser<'a> {
    registry: &'a Registry,
}

impl<'a> ReferenceParser<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Normalize a human reference to its canonical form.
    ///
    /// Returns `None` when the book cannot be resolved or the chapter and
    /// verse are not numeric. A bare book name has no chapter and is also
    /// `None`.
    pub fn normalize(&self, input: &str) -> Option<NormalizedRef> {
        let cleaned = input.trim().replace(',', ":");
        let parts: Vec<&str> = cleaned.split_whitespace().collect();

        let (key, remainder) = self.split_book(&parts)?;
        let code = self.registry.code_for_key(key)?;
        let (chapter, verse) = parse_chapter_verse(&remainder)?;
        if chapter == 0 {
            return None;
        }

        trace!("Normalized '{}' to {}.{}.{}", input, code, chapter, verse);
        Some(NormalizedRef::new(code, chapter, verse))
    }

    /// Normalize a relation target, accepting a trailing range.
    ///
    /// `"Mc 8:29-30"` gives `MRK.8.29-30`; `"Mc 8:29-Mc 9:1"` gives
    /// `MRK.8.29-MRK.9.1`; `"Mc 8:29-9:1"` stays in the start's book.
    pub fn parse_target(&self, input: &str) -> Option<RelationTarget> {
        let input = input.trim();
        if let Some(single) = self.normalize(input) {
            return Some(RelationTarget::single(single.address()));
        }

        let (head, tail) = input.rsplit_once('-')?;
        let start = self.normalize(head)?;
        let tail = tail.trim();
        if start.verse == 0 || tail.is_empty() {
            return None;
        }

        if let Ok(end_verse) = tail.parse::<u32>() {
            return (end_verse > start.verse)
                .then(|| RelationTarget::range(start.address(), RangeEnd::Verse(end_verse)));
        }

        let end = match self.normalize(tail) {
            Some(end) => end.address(),
            None => {
                let (chapter, verse) = parse_chapter_verse(&tail.replace(',', ":"))?;
                if chapter == 0 {
                    return None;
                }
                CanonicalAddress::new(start.book_code.clone(), chapter, verse)
            }
        };
        Some(RelationTarget::range(start.address(), RangeEnd::Address(end)))
    }

    /// Identify the book portion of a whitespace-split reference.
    ///
    /// Returns the internal key and the unparsed chapter/verse remainder.
    fn split_book(&self, parts: &[&str]) -> Option<(&'a str, String)> {
        match parts {
            [] => None,
            [token] => {
                if token.contains('.') && !is_dotted_number(token) {
                    let (book, rest) = token.split_once('.')?;
                    let key = self.registry.resolve_abbreviation(book)?;
                    Some((key, rest.to_string()))
                } else {
                    let key = self.registry.resolve_abbreviation(token)?;
                    Some((key, String::new()))
                }
            }
            [first, second, rest @ ..] => {
                let two_word = format!("{first} {second}");
                if let Some(key) = self.registry.resolve_abbreviation(&two_word) {
                    return Some((key, rest.join(" ")));
                }
                let key = self.registry.resolve_abbreviation(first)?;
                Some((key, parts[1..].join(" ")))
            }
        }
    }
}

/// True when the token is nothing but digits once dots are removed.
fn is_dotted_number(token: &str) -> bool {
    let mut digits = token.chars().filter(|&c| c != '.').peekable();
    digits.peek().is_some() && digits.all(|c| c.is_ascii_digit())
}

/// Parse `chapter[.verse]`, with `:` accepted as the separator.
///
/// An empty remainder yields chapter 0, which callers reject.
fn parse_chapter_verse(remainder: &str) -> Option<(u32, u32)> {
    let remainder = remainder.replace(':', ".");
    let remainder = remainder.trim();
    if remainder.is_empty() {
        return Some((0, 0));
    }
    if remainder.contains('.') {
        let mut segments = remainder.split('.');
        let chapter = segments.next()?.trim().parse().ok()?;
        let verse = segments.next()?.trim().parse().ok()?;
        Some((chapter, verse))
    } else {
        Some((remainder.parse().ok()?, 0))
    }
}
