//! Book Identity Registry
//!
//! Unifies the many language-specific ways of naming a book (English and
//! French labels, abbreviations with or without internal spaces, LXX-style
//! short forms) under one canonical book code.
//!
//! # Architecture
//!
//! ```text
//! Registry
//! ├── books:         Vec<BookMetadata>          # table order = canonical order
//! ├── by_code:       HashMap<code, index>
//! ├── key_to_code:   HashMap<internal_key, code>
//! └── surface_forms: HashMap<surface, internal_key>
//! ```
//!
//! A `Registry` is an ordinary value. Build one at startup and pass it by
//! reference to the parser, tokenizer and store; several registries may
//! coexist (tests build their own from inline tables).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::reference::CanonicalAddress;

/// Book table shipped with the crate.
pub const BUNDLED_BOOK_TABLE: &str = include_str!("../data/bible_books.json");

/// Canonical codes of the Old-Testament books of this corpus.
pub const OLD_TESTAMENT: [&str; 39] = [
    "GEN", "EXO", "LEV", "NUM", "DEU", "JOS", "JDG", "RUT", "1SA", "2SA", "1KI", "2KI", "1CH",
    "2CH", "EZR", "NEH", "EST", "JOB", "PSA", "PRO", "ECC", "SNG", "ISA", "JER", "LAM", "EZK",
    "DAN", "HOS", "JOL", "AMO", "OBA", "JON", "MIC", "NAM", "HAB", "ZEP", "HAG", "ZEC", "MAL",
];

/// Canonical codes of the New-Testament books of this corpus.
pub const NEW_TESTAMENT: [&str; 27] = [
    "MAT", "MRK", "LUK", "JHN", "ACT", "ROM", "1CO", "2CO", "GAL", "EPH", "PHP", "COL", "1TH",
    "2TH", "1TI", "2TI", "TIT", "PHM", "HEB", "JAS", "1PE", "2PE", "1JN", "2JN", "3JN", "JUD",
    "REV",
];

/// Errors raised by strict registry construction.
///
/// [`Registry::load`] never returns these; it logs them and falls back to an
/// empty registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Book table could not be read
    #[error("failed to read book table '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Book table is not valid JSON or has the wrong shape
    #[error("failed to parse book table: {0}")]
    Parse(#[from] serde_json::Error),

    /// Top-level document is not an object of books
    #[error("book table must be an object keyed by book code")]
    NotAnObject,
}

/// Testament membership of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Testament {
    Old,
    New,
    /// Outside both closed sets (e.g. deuterocanonical books)
    Neither,
}

impl Testament {
    /// Classify a canonical book code.
    pub fn of(code: &str) -> Self {
        if OLD_TESTAMENT.contains(&code) {
            Testament::Old
        } else if NEW_TESTAMENT.contains(&code) {
            Testament::New
        } else {
            Testament::Neither
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Testament::Old => "ot",
            Testament::New => "nt",
            Testament::Neither => "generic",
        }
    }
}

/// One language block of a book table entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageEntry {
    #[serde(default)]
    pub label: Option<String>,

    /// First entry is the display form
    #[serde(default)]
    pub abbreviations: Vec<String>,

    /// Book name used by the BHSA Hebrew corpus, when it differs from `label`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bhsa_label: Option<String>,
}

/// A book table entry as it appears on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookTableEntry {
    #[serde(default)]
    pub en: LanguageEntry,
    #[serde(default)]
    pub fr: LanguageEntry,
}

/// Everything the registry knows about one canonical book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookMetadata {
    pub code: String,
    /// Diacritic-free join key, e.g. `I_Corinthians`
    pub internal_key: String,
    pub english_label: String,
    pub french_label: Option<String>,
    /// English abbreviations followed by French ones
    pub abbreviations: Vec<String>,
    pub french_abbreviations: Vec<String>,
    pub bhsa_label: String,
    pub order_index: usize,
    pub testament: Testament,
}

impl BookMetadata {
    /// Canonical display abbreviation (first English abbreviation).
    pub fn display_abbreviation(&self) -> &str {
        self.abbreviations
            .first()
            .map(String::as_str)
            .unwrap_or(&self.code)
    }

    /// French display abbreviation, if the table provides one.
    pub fn french_abbreviation(&self) -> Option<&str> {
        self.french_abbreviations.first().map(String::as_str)
    }
}

/// A surface form registered for two different books.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceCollision {
    pub form: String,
    pub previous_key: String,
    pub key: String,
}

/// Derive the internal key from an English label.
///
/// Ordinal prefixes become Roman-numeral tokens and spaces become
/// underscores: `"1 Corinthians"` → `"I_Corinthians"`.
pub fn internal_key_for(label: &str) -> String {
    let key = if let Some(rest) = label.strip_prefix("1 ") {
        format!("I_{rest}")
    } else if let Some(rest) = label.strip_prefix("2 ") {
        format!("II_{rest}")
    } else if let Some(rest) = label.strip_prefix("3 ") {
        format!("III_{rest}")
    } else {
        label.to_string()
    };
    key.replace(' ', "_")
}

/// Lookup tables over the book metadata table.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    books: Vec<BookMetadata>,
    by_code: HashMap<String, usize>,
    key_to_code: HashMap<String, String>,
    surface_forms: HashMap<String, String>,
    collisions: Vec<SurfaceCollision>,
}

impl Registry {
    /// Create an empty registry. Every lookup on it fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry over the book table shipped with the crate.
    pub fn bundled() -> Self {
        match Self::from_json_str(BUNDLED_BOOK_TABLE) {
            Ok(registry) => registry,
            Err(e) => {
                warn!("Bundled book table is unusable: {}", e);
                Self::empty()
            }
        }
    }

    /// Load a book table from disk, tolerating a missing or malformed file.
    ///
    /// Failures are logged and produce an empty registry, on which reference
    /// resolution simply reports "unresolved".
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(registry) => {
                debug!("Loaded {} books from {:?}", registry.len(), path);
                registry
            }
            Err(RegistryError::ReadFile { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                warn!("Book table not found at {:?}", path);
                Self::empty()
            }
            Err(e) => {
                warn!("Could not load book table {:?}: {}", path, e);
                Self::empty()
            }
        }
    }

    /// Strict variant of [`Registry::load`].
    pub fn try_load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Build a registry from a JSON book table.
    ///
    /// Accepts either `{"books": {CODE: {...}}}` or a bare `{CODE: {...}}`
    /// map. Entry order is the canonical book order.
    pub fn from_json_str(content: &str) -> Result<Self, RegistryError> {
        let document: Value = serde_json::from_str(content)?;
        let books = match document {
            Value::Object(mut map) => match map.remove("books") {
                Some(Value::Object(books)) => books,
                Some(_) => return Err(RegistryError::NotAnObject),
                None => map,
            },
            _ => return Err(RegistryError::NotAnObject),
        };

        let mut entries = Vec::with_capacity(books.len());
        for (code, value) in books {
            let entry: BookTableEntry = serde_json::from_value(value)?;
            entries.push((code, entry));
        }
        Ok(Self::from_entries(entries))
    }

    /// Build a registry from already-parsed entries, in canonical order.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, BookTableEntry)>) -> Self {
        let mut registry = Self::empty();
        for (order_index, (code, entry)) in entries.into_iter().enumerate() {
            registry.insert_book(order_index, code, entry);
        }
        registry
    }

    fn insert_book(&mut self, order_index: usize, code: String, entry: BookTableEntry) {
        let Some(english_label) = entry.en.label.filter(|l| !l.is_empty()) else {
            warn!("Book '{}' has no English label, skipping", code);
            return;
        };
        let key = internal_key_for(&english_label);

        self.register(&key, &key);
        self.register(&code, &key);
        self.register(&english_label, &key);
        for abbr in entry.en.abbreviations.iter().chain(&entry.fr.abbreviations) {
            self.register(abbr, &key);
            if abbr.contains(' ') {
                self.register(&abbr.replace(' ', ""), &key);
            }
        }
        if let Some(ref fr_label) = entry.fr.label {
            self.register(fr_label, &key);
        }

        let mut abbreviations = entry.en.abbreviations;
        abbreviations.extend(entry.fr.abbreviations.iter().cloned());

        let book = BookMetadata {
            testament: Testament::of(&code),
            bhsa_label: entry
                .en
                .bhsa_label
                .unwrap_or_else(|| english_label.clone()),
            code: code.clone(),
            internal_key: key.clone(),
            english_label,
            french_label: entry.fr.label,
            abbreviations,
            french_abbreviations: entry.fr.abbreviations,
            order_index,
        };

        trace!("Registered book {} as {}", code, key);
        self.key_to_code.insert(key, code.clone());
        self.by_code.insert(code, self.books.len());
        self.books.push(book);
    }

    fn register(&mut self, form: &str, key: &str) {
        if form.is_empty() {
            return;
        }
        if let Some(previous) = self
            .surface_forms
            .insert(form.to_string(), key.to_string())
        {
            if previous != key {
                debug!(
                    "Surface form '{}' moved from {} to {}",
                    form, previous, key
                );
                self.collisions.push(SurfaceCollision {
                    form: form.to_string(),
                    previous_key: previous,
                    key: key.to_string(),
                });
            }
        }
    }

    /// Number of books.
    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Resolve any surface form to its internal key.
    pub fn resolve_abbreviation(&self, token: &str) -> Option<&str> {
        self.surface_forms.get(token).map(String::as_str)
    }

    /// Canonical code for an internal key.
    pub fn code_for_key(&self, key: &str) -> Option<&str> {
        self.key_to_code.get(key).map(String::as_str)
    }

    /// Resolve any surface form straight to a canonical code.
    pub fn resolve_code(&self, token: &str) -> Option<&str> {
        self.resolve_abbreviation(token)
            .and_then(|key| self.code_for_key(key))
    }

    pub fn book(&self, code: &str) -> Option<&BookMetadata> {
        self.by_code.get(code).map(|&i| &self.books[i])
    }

    /// Books in canonical order.
    pub fn books(&self) -> &[BookMetadata] {
        &self.books
    }

    /// French display abbreviation of a book, e.g. `Mc` for `MRK`.
    pub fn french_abbreviation(&self, code: &str) -> Option<&str> {
        self.book(code).and_then(BookMetadata::french_abbreviation)
    }

    pub fn order_index(&self, code: &str) -> Option<usize> {
        self.by_code.get(code).copied()
    }

    pub fn is_old_testament(&self, code: &str) -> bool {
        Testament::of(code) == Testament::Old
    }

    pub fn is_new_testament(&self, code: &str) -> bool {
        Testament::of(code) == Testament::New
    }

    /// Iterate `(surface form, canonical code)` pairs.
    pub fn surface_forms(&self) -> impl Iterator<Item = (&str, &str)> {
        self.surface_forms.iter().filter_map(|(form, key)| {
            self.code_for_key(key)
                .map(|code| (form.as_str(), code))
        })
    }

    /// Surface forms that were registered for more than one book.
    ///
    /// Always empty for well-formed tables.
    pub fn collisions(&self) -> &[SurfaceCollision] {
        &self.collisions
    }

    /// Sort key of an address: `(order_index, chapter, verse)`.
    ///
    /// Books unknown to this registry sort after every known book.
    pub fn sort_key(&self, address: &CanonicalAddress) -> (usize, u32, u32) {
        (
            self.order_index(&address.book).unwrap_or(usize::MAX),
            address.chapter,
            address.verse,
        )
    }

    /// Compare two addresses in canonical book order.
    pub fn compare(&self, a: &CanonicalAddress, b: &CanonicalAddress) -> Ordering {
        self.sort_key(a)
            .cmp(&self.sort_key(b))
            .then_with(|| a.book.cmp(&b.book))
    }
}
