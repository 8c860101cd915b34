//! Note tokenizer
//!
//! Scans free-form annotation text ("w 1.27 ; 2 Co 8.12 – 6.2") and infers the
//! references it cites. A book abbreviation sets the book for the following
//! `chapter.verse` tokens until a dash separator resets it to the default
//! book of the note.
//!
//! Results are [`InferredRelation`]s: guesses that carry the span they came
//! from. They become stored [`Relation`]s only through
//! [`InferredRelation::accept`].
//!
//! Known limitation: in list forms such as `10.24,32` only `10.24` is
//! captured; the trailing `32` is not reattached to chapter 10.

use std::collections::HashMap;
use std::ops::Range;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

use crate::collection::{Relation, RelationType};
use crate::registry::Registry;

const REFERENCE_PATTERN: &str = r"\d+\.\d+(?:[-+]\d+(?:-\d+)?)?";
const SEPARATOR_PATTERN: &str = "[–—]";

/// Error building a tokenizer.
#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("failed to compile note pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Replace no-break spaces with ASCII spaces.
///
/// Spans reported by the tokenizer are byte offsets into this normalized
/// text, not into the raw input.
pub fn normalize_spaces(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
}

/// A relation guessed from note text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredRelation {
    /// `BOOK.C.V`, possibly followed by a range suffix
    pub target: String,
    pub kind: RelationType,
    /// Byte range of the reference token in the space-normalized note
    pub span: Range<usize>,
    /// Book abbreviation that set the context, `None` for the default book
    pub book_token: Option<String>,
}

impl InferredRelation {
    /// Accept the guess as a stored relation.
    pub fn accept(self) -> Relation {
        Relation::new(self.target, self.kind, String::new())
    }
}

/// Extracts references from annotation text.
#[derive(Debug, Clone)]
pub struct NoteTokenizer {
    pattern: Regex,
    codes: HashMap<String, String>,
}

impl NoteTokenizer {
    /// Build the combined book/reference/separator pattern for a registry.
    pub fn new(registry: &Registry) -> Result<Self, TokenizerError> {
        let codes: HashMap<String, String> = registry
            .surface_forms()
            .map(|(form, code)| (form.to_string(), code.to_string()))
            .collect();

        let mut forms: Vec<&str> = codes.keys().map(String::as_str).collect();
        // Alternation is leftmost-first, so longer forms must come first.
        forms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut alternatives = Vec::with_capacity(3);
        if !forms.is_empty() {
            let books = forms
                .iter()
                .map(|form| format!(r"\b{}\b", regex::escape(form)))
                .collect::<Vec<_>>()
                .join("|");
            alternatives.push(format!("(?P<book>{books})"));
        }
        alternatives.push(format!("(?P<reference>{REFERENCE_PATTERN})"));
        alternatives.push(format!("(?P<separator>{SEPARATOR_PATTERN})"));

        let pattern = Regex::new(&alternatives.join("|"))?;
        debug!("Note tokenizer built over {} surface forms", forms.len());

        Ok(Self { pattern, codes })
    }

    /// Infer the references cited by `raw`, resolving bare references to
    /// `default_book`.
    pub fn extract_relations(&self, raw: &str, default_book: &str) -> Vec<InferredRelation> {
        let text = normalize_spaces(raw);
        let mut current_book = default_book.to_string();
        let mut book_token: Option<String> = None;
        let mut relations = Vec::new();

        for caps in self.pattern.captures_iter(&text) {
            if let Some(book) = caps.name("book") {
                if let Some(code) = self.codes.get(book.as_str()) {
                    current_book = code.clone();
                    book_token = Some(book.as_str().to_string());
                }
            } else if caps.name("separator").is_some() {
                current_book = default_book.to_string();
                book_token = None;
            } else if let Some(reference) = caps.name("reference") {
                let target = format!("{}.{}", current_book, reference.as_str().replace('+', ""));
                trace!("Inferred {} from '{}'", target, reference.as_str());
                relations.push(InferredRelation {
                    target,
                    kind: RelationType::Parallel,
                    span: reference.range(),
                    book_token: book_token.clone(),
                });
            }
        }

        relations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn targets(note: &str, default_book: &str) -> Vec<String> {
        let registry = Registry::bundled();
        let tokenizer = NoteTokenizer::new(&registry).unwrap();
        tokenizer
            .extract_relations(note, default_book)
            .into_iter()
            .map(|r| r.target)
            .collect()
    }

    #[test]
    fn test_default_book_and_explicit_book() {
        let registry = Registry::bundled();
        let tokenizer = NoteTokenizer::new(&registry).unwrap();
        let relations = tokenizer.extract_relations("w 1.27 ; 2 Co 8.12", "MRK");

        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].target, "MRK.1.27");
        assert_eq!(relations[0].book_token, None);
        assert_eq!(relations[1].target, "2CO.8.12");
        assert_eq!(relations[1].book_token.as_deref(), Some("2 Co"));
        assert!(relations.iter().all(|r| r.kind == RelationType::Parallel));
    }

    #[test]
    fn test_dash_resets_to_default_book() {
        assert_eq!(targets("Mt 5.1 – 6.2", "MRK"), vec!["MAT.5.1", "MRK.6.2"]);
        assert_eq!(targets("Mt 5.1 — 6.2", "MRK"), vec!["MAT.5.1", "MRK.6.2"]);
    }

    #[test]
    fn test_book_context_carries_forward() {
        assert_eq!(
            targets("Lc 4.16 ; 4.31 ; Jn 2.1", "MRK"),
            vec!["LUK.4.16", "LUK.4.31", "JHN.2.1"]
        );
    }

    #[test]
    fn test_no_break_space_in_book() {
        assert_eq!(targets("2\u{a0}Co 8.12", "MRK"), vec!["2CO.8.12"]);
    }

    #[test]
    fn test_ranges_and_plus_signs() {
        assert_eq!(
            targets("Mt 3.1-6 ; 4.1+3", "MRK"),
            vec!["MAT.3.1-6", "MAT.4.13"]
        );
        assert_eq!(targets("Jn 1.19-2-3", "MRK"), vec!["JHN.1.19-2-3"]);
    }

    #[test]
    fn test_list_form_drops_trailing_verse() {
        // The bare "32" is not reattached to chapter 10.
        assert_eq!(targets("10.24,32", "MRK"), vec!["MRK.10.24"]);
    }

    #[test]
    fn test_span_points_at_reference() {
        let registry = Registry::bundled();
        let tokenizer = NoteTokenizer::new(&registry).unwrap();
        let note = "voir Lc 4.16";
        let relations = tokenizer.extract_relations(note, "MRK");
        assert_eq!(&note[relations[0].span.clone()], "4.16");
    }

    #[test]
    fn test_accept_produces_relation() {
        let registry = Registry::bundled();
        let tokenizer = NoteTokenizer::new(&registry).unwrap();
        let inferred = tokenizer.extract_relations("Ex 23.20", "MRK").remove(0);
        let relation = inferred.accept();
        assert_eq!(relation, Relation::new("EXO.23.20", RelationType::Parallel, ""));
    }

    #[test]
    fn test_empty_registry_uses_default_book() {
        let registry = Registry::empty();
        let tokenizer = NoteTokenizer::new(&registry).unwrap();
        let relations = tokenizer.extract_relations("Mt 5.1", "MRK");
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].target, "MRK.5.1");
    }
}
