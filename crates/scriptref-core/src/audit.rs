//! Relation audit
//!
//! Reconciliation pass over ingested collections. A relation that points at
//! the default book, while its note text names another book right before the
//! cited digits, was most likely mis-attributed by the tokenizer (a missed
//! abbreviation, or a dash that reset the book too early).

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::collection::SourceEntry;
use crate::registry::Registry;
use crate::tokenizer::normalize_spaces;

/// Characters inspected before a cited `chapter.verse`.
const PREFIX_WINDOW: usize = 10;

/// A relation whose note text disagrees with its target book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditFinding {
    pub source: String,
    pub target: String,
    /// Surface form found in front of the digits
    pub book_form: String,
    /// Note text around the digits
    pub excerpt: String,
}

impl fmt::Display for AuditFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: target {} but note reads '...{}...' ({})",
            self.source, self.target, self.excerpt, self.book_form
        )
    }
}

/// Check every default-book relation of `entries` against its note text.
///
/// Reports at most one finding per relation.
pub fn audit_entries(registry: &Registry, default_book: &str, entries: &[SourceEntry]) -> Vec<AuditFinding> {
    let mut forms: Vec<&str> = registry
        .surface_forms()
        .filter(|(_, code)| *code != default_book)
        .map(|(form, _)| form)
        .collect();
    forms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut findings = Vec::new();
    for entry in entries {
        let Some(notes) = entry.notes.as_deref() else {
            continue;
        };
        let notes = normalize_spaces(notes);

        for relation in &entry.relations {
            let parts: Vec<&str> = relation.target.split('.').collect();
            if parts.len() < 3 || parts[0] != default_book {
                continue;
            }
            let digits = format!("{}.{}", parts[1], parts[2]);

            let found = notes.match_indices(&digits).find_map(|(at, _)| {
                let prefix = window_before(&notes, at);
                mismatched_form(prefix, &forms).map(|form| (form, at))
            });

            if let Some((form, at)) = found {
                let start = at - window_before(&notes, at).len();
                let excerpt = notes[start..at + digits.len()].trim().to_string();
                debug!("{}: {} follows '{}'", entry.source, relation.target, form);
                findings.push(AuditFinding {
                    source: entry.source.clone(),
                    target: relation.target.clone(),
                    book_form: form.to_string(),
                    excerpt,
                });
            }
        }
    }
    findings
}

/// Up to [`PREFIX_WINDOW`] characters ending at byte `at`.
fn window_before(text: &str, at: usize) -> &str {
    let head = &text[..at];
    let start = head
        .char_indices()
        .rev()
        .nth(PREFIX_WINDOW - 1)
        .map_or(0, |(i, _)| i);
    &head[start..]
}

/// Longest form the trimmed prefix ends with, starting at a word boundary.
fn mismatched_form<'f>(prefix: &str, forms: &[&'f str]) -> Option<&'f str> {
    let prefix = prefix.trim_end();
    forms.iter().copied().find(|form| {
        prefix.strip_suffix(form).is_some_and(|before| {
            before
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_alphanumeric())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{Relation, RelationType};
    use pretty_assertions::assert_eq;

    fn entry(source: &str, notes: &str, targets: &[&str]) -> SourceEntry {
        let mut entry = SourceEntry::new(source);
        entry.notes = Some(notes.to_string());
        entry.relations = targets
            .iter()
            .map(|t| Relation::new(*t, RelationType::Parallel, ""))
            .collect();
        entry
    }

    #[test]
    fn test_flags_misattributed_relation() {
        let registry = Registry::bundled();
        let entries = vec![entry("MRK.1.2", "cf. Lc 7.27", &["MRK.7.27"])];

        let findings = audit_entries(&registry, "MRK", &entries);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].source, "MRK.1.2");
        assert_eq!(findings[0].target, "MRK.7.27");
        assert_eq!(findings[0].book_form, "Lc");
        assert_eq!(findings[0].excerpt, "cf. Lc 7.27");
    }

    #[test]
    fn test_longest_form_reported() {
        let registry = Registry::bundled();
        let entries = vec![entry("MRK.1.2", "voir 1 Jn 4.9", &["MRK.4.9"])];
        let findings = audit_entries(&registry, "MRK", &entries);
        assert_eq!(findings[0].book_form, "1 Jn");
    }

    #[test]
    fn test_correct_relations_pass() {
        let registry = Registry::bundled();
        let entries = vec![
            entry("MRK.1.2", "Lc 7.27 – 3.4", &["LUK.7.27", "MRK.3.4"]),
            entry("MRK.1.3", "Mc 9.12", &["MRK.9.12"]),
        ];
        assert!(audit_entries(&registry, "MRK", &entries).is_empty());
    }

    #[test]
    fn test_form_must_start_at_word_boundary() {
        let registry = Registry::bundled();
        // "Oslo" ends with "lo", and no book is abbreviated "lo"; "Os" is
        // not a suffix either, so nothing is reported.
        let entries = vec![entry("MRK.1.2", "Oslo 4.9", &["MRK.4.9"])];
        assert!(audit_entries(&registry, "MRK", &entries).is_empty());

        let entries = vec![entry("MRK.1.2", "Ros 4.9", &["MRK.4.9"])];
        assert!(audit_entries(&registry, "MRK", &entries).is_empty());
    }

    #[test]
    fn test_no_break_space_is_normalized() {
        let registry = Registry::bundled();
        let entries = vec![entry("MRK.1.2", "2\u{a0}Co 8.12", &["MRK.8.12"])];
        let findings = audit_entries(&registry, "MRK", &entries);
        assert_eq!(findings[0].book_form, "2 Co");
    }

    #[test]
    fn test_entries_without_notes_are_ignored() {
        let registry = Registry::bundled();
        let mut bare = SourceEntry::new("MRK.1.2");
        bare.relations.push(Relation::new("MRK.7.27", RelationType::Parallel, ""));
        assert!(audit_entries(&registry, "MRK", &[bare]).is_empty());
    }
}
