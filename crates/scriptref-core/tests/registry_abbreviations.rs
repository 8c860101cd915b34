//! Exhaustive resolution tests over the bundled book table.
//!
//! Every surface form the registry knows must round-trip through the
//! reference parser and the note tokenizer.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package scriptref-core --test registry_abbreviations
//! ```

use scriptref_core::{NoteTokenizer, ReferenceParser, Registry};

// ============================================================================
// Parser
// ============================================================================

#[test]
fn every_abbreviation_resolves_with_chapter_and_verse() {
    let registry = Registry::bundled();
    let parser = ReferenceParser::new(&registry);

    let mut failures = Vec::new();
    for book in registry.books() {
        for abbreviation in &book.abbreviations {
            let input = format!("{abbreviation} 1:1");
            match parser.normalize(&input) {
                Some(r) if r.book_code == book.code && r.chapter == 1 && r.verse == 1 => {}
                other => failures.push(format!("{input} -> {other:?} (expected {})", book.code)),
            }
        }
    }
    assert!(failures.is_empty(), "unresolved:\n{}", failures.join("\n"));
}

#[test]
fn every_label_and_code_resolves() {
    let registry = Registry::bundled();
    let parser = ReferenceParser::new(&registry);

    for book in registry.books() {
        let by_code = parser.normalize(&format!("{} 2", book.code)).unwrap();
        assert_eq!(by_code.canonical, format!("{}.2", book.code));

        // Book names of three or more words are not parsed.
        if book.english_label.split_whitespace().count() > 2 {
            continue;
        }
        let by_label = parser
            .normalize(&format!("{} 3:4", book.english_label))
            .unwrap_or_else(|| panic!("label of {} did not resolve", book.code));
        assert_eq!(by_label.book_code, book.code);
    }
}

#[test]
fn spaceless_abbreviations_resolve() {
    let registry = Registry::bundled();
    let parser = ReferenceParser::new(&registry);

    for book in registry.books() {
        for abbreviation in book.abbreviations.iter().filter(|a| a.contains(' ')) {
            let spaceless = abbreviation.replace(' ', "");
            let resolved = parser.normalize(&format!("{spaceless} 1:1"));
            assert_eq!(
                resolved.map(|r| r.book_code),
                Some(book.code.clone()),
                "{spaceless}"
            );
        }
    }
}

#[test]
fn books_outside_both_testaments_are_deuterocanonical() {
    let registry = Registry::bundled();
    let neither: Vec<&str> = registry
        .books()
        .iter()
        .filter(|b| !registry.is_old_testament(&b.code) && !registry.is_new_testament(&b.code))
        .map(|b| b.code.as_str())
        .collect();
    assert_eq!(neither, vec!["TOB", "JDT", "1MA", "2MA", "WIS", "SIR", "BAR"]);
}

// ============================================================================
// Tokenizer
// ============================================================================

#[test]
fn every_surface_form_is_recognized_in_notes() {
    let registry = Registry::bundled();
    let tokenizer = NoteTokenizer::new(&registry).unwrap();

    for (form, code) in registry.surface_forms() {
        let note = format!("cf. {form} 2.3");
        let relations = tokenizer.extract_relations(&note, "XXX");
        assert_eq!(relations.len(), 1, "{note}");
        assert_eq!(relations[0].target, format!("{code}.2.3"), "{note}");
    }
}
