//! Annotation ingestion
//!
//! Reads plain-text annotation files laid out as chapter headers followed by
//! one line per annotated verse:
//!
//! ```text
//! MARC 1 :
//! y 1.2 Ml 3.1 ; Ex 23.20
//! z 1.315.41 ; Lc 4.38
//! ```
//!
//! Each line may start with a one-letter marker. The source verse prefix is
//! often fused with the first reference (`1.315.41` is `1.31` then `5.41`);
//! the split is recovered with [`longest_valid_verse`].

use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

use crate::collection::{CollectionFile, SourceEntry};
use crate::disambiguate::{longest_valid_verse, VerseCounts, VerseGuess};
use crate::reference::CanonicalAddress;
use crate::registry::Registry;
use crate::tokenizer::{InferredRelation, NoteTokenizer, TokenizerError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unknown book code: {0}")]
    UnknownBook(String),

    #[error("invalid header label '{label}': {source}")]
    HeaderPattern {
        label: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
}

/// One annotated verse read from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedEntry {
    pub source: CanonicalAddress,
    pub notes: String,
    pub relations: Vec<InferredRelation>,
}

/// Result of ingesting one annotation text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub entries: Vec<IngestedEntry>,
    /// Non-empty lines that were neither headers nor annotated verses
    pub skipped_lines: usize,
}

impl IngestReport {
    pub fn relation_count(&self) -> usize {
        self.entries.iter().map(|e| e.relations.len()).sum()
    }

    /// Accept every inferred relation and build a collection document.
    pub fn into_collection(self, description: impl Into<String>) -> CollectionFile {
        let mut collection = CollectionFile::new(description);
        for entry in self.entries {
            let mut source = SourceEntry::new(entry.source.to_string());
            source.notes = Some(entry.notes);
            source.relations = entry
                .relations
                .into_iter()
                .map(InferredRelation::accept)
                .collect();
            collection.cross_references.push(source);
        }
        collection
    }
}

/// Turns annotation text for one book into source entries.
#[derive(Debug, Clone)]
pub struct NoteIngestor {
    book_code: String,
    tokenizer: NoteTokenizer,
    header: Regex,
    marker: Regex,
    repair_marker: Regex,
    verse_counts: VerseCounts,
}

impl NoteIngestor {
    /// Create an ingestor for `book_code`.
    ///
    /// `header_label` defaults to the book's French label in upper case
    /// (`MARC` for Mark), falling back to the English label.
    pub fn new(
        registry: &Registry,
        book_code: &str,
        header_label: Option<&str>,
        verse_counts: VerseCounts,
    ) -> Result<Self, IngestError> {
        let book = registry
            .book(book_code)
            .ok_or_else(|| IngestError::UnknownBook(book_code.to_string()))?;

        let label = match header_label {
            Some(label) => label.to_string(),
            None => book
                .french_label
                .as_deref()
                .unwrap_or(&book.english_label)
                .to_uppercase(),
        };
        let header = Regex::new(&format!(r"(?i)^{}\s+(\d+)\s*:", regex::escape(&label)))
            .map_err(|source| IngestError::HeaderPattern {
                label: label.clone(),
                source,
            })?;
        debug!("Ingesting {} with chapter header '{}'", book_code, label);

        Ok(Self {
            book_code: book.code.clone(),
            tokenizer: NoteTokenizer::new(registry)?,
            header,
            marker: marker_pattern(r"^[a-z]\s+")?,
            repair_marker: marker_pattern(r"^[a-z](?:\s+|$)")?,
            verse_counts,
        })
    }

    pub fn book_code(&self) -> &str {
        &self.book_code
    }

    /// Parse annotation text into entries with inferred relations.
    pub fn ingest_text(&self, text: &str) -> IngestReport {
        let mut report = IngestReport::default();
        let mut chapter = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(number) = self.header_chapter(line) {
                trace!("Chapter {}", number);
                chapter = Some(number);
                continue;
            }
            let Some(current) = chapter else {
                report.skipped_lines += 1;
                continue;
            };

            let cleaned = self.marker.replace(line, "");
            let Some((guess, content)) = self.split_source(&cleaned, current) else {
                trace!("Skipping line without source verse: {}", line);
                report.skipped_lines += 1;
                continue;
            };

            let notes = content.trim().to_string();
            let relations = self.tokenizer.extract_relations(&notes, &self.book_code);
            report.entries.push(IngestedEntry {
                source: CanonicalAddress::new(self.book_code.clone(), current, guess.verse()),
                notes,
                relations,
            });
        }

        debug!(
            "Ingested {} entries ({} relations, {} lines skipped)",
            report.entries.len(),
            report.relation_count(),
            report.skipped_lines
        );
        report
    }

    /// Insert a tab between fused source prefixes and their notes.
    ///
    /// `y 1.315.41 ...` becomes `y 1.31\t5.41 ...`. Every other line,
    /// including lines already separated, is kept byte for byte.
    pub fn repair_text(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + text.len() / 32);
        let mut chapter = None;

        for line in text.split_inclusive('\n') {
            let body = line.trim_end_matches(['\n', '\r']);
            let ending = &line[body.len()..];

            if let Some(number) = self.header_chapter(body.trim()) {
                chapter = Some(number);
                out.push_str(line);
                continue;
            }

            match chapter.and_then(|c| self.repair_line(body, c)) {
                Some(fixed) => {
                    out.push_str(&fixed);
                    out.push_str(ending);
                }
                None => out.push_str(line),
            }
        }
        out
    }

    fn repair_line(&self, body: &str, chapter: u32) -> Option<String> {
        let marker_len = self.repair_marker.find(body).map_or(0, |m| m.end());
        let (marker, rest) = body.split_at(marker_len);
        let (_, content) = self.split_source(rest, chapter)?;
        if content.is_empty() || content.starts_with(char::is_whitespace) {
            return None;
        }
        let source = &rest[..rest.len() - content.len()];
        Some(format!("{marker}{source}\t{content}"))
    }

    fn header_chapter(&self, line: &str) -> Option<u32> {
        self.header
            .captures(line)
            .and_then(|caps| caps[1].parse().ok())
            .filter(|&chapter| chapter > 0)
    }

    /// Split `{chapter}.{digits}...` into the source verse and the rest.
    fn split_source<'t>(&self, line: &'t str, chapter: u32) -> Option<(VerseGuess, &'t str)> {
        let rest = line.strip_prefix(&format!("{chapter}."))?;
        let digit_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let guess = longest_valid_verse(&rest[..digit_len], chapter, &self.verse_counts)?;
        let content = &rest[guess.len()..];
        Some((guess, content))
    }
}

fn marker_pattern(pattern: &str) -> Result<Regex, IngestError> {
    Regex::new(pattern).map_err(|source| IngestError::HeaderPattern {
        label: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
MARC 1 :
y 1.2 Ml 3.1 ; Ex 23.20
z 1.315.41 ; Lc 4.38
ligne parasite

MARC 2 :
a 2.1 voir 1.45
";

    fn ingestor() -> NoteIngestor {
        let registry = Registry::bundled();
        NoteIngestor::new(&registry, "MRK", None, VerseCounts::mark()).unwrap()
    }

    #[test]
    fn test_ingest_sample() {
        let report = ingestor().ingest_text(SAMPLE);

        let sources: Vec<String> = report.entries.iter().map(|e| e.source.to_string()).collect();
        assert_eq!(sources, vec!["MRK.1.2", "MRK.1.31", "MRK.2.1"]);
        assert_eq!(report.skipped_lines, 1);

        let targets: Vec<&str> = report.entries[1]
            .relations
            .iter()
            .map(|r| r.target.as_str())
            .collect();
        assert_eq!(targets, vec!["MRK.5.41", "LUK.4.38"]);
        assert_eq!(report.entries[0].notes, "Ml 3.1 ; Ex 23.20");
        assert_eq!(report.entries[2].relations[0].target, "MRK.1.45");
    }

    #[test]
    fn test_lines_before_header_are_skipped() {
        let report = ingestor().ingest_text("y 1.2 Ml 3.1\nMARC 1 :\ny 1.3 Is 40.3\n");
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].source.to_string(), "MRK.1.3");
        assert_eq!(report.skipped_lines, 1);
    }

    #[test]
    fn test_header_is_case_insensitive() {
        let report = ingestor().ingest_text("Marc 3 :\nb 3.7 Mt 12.15\n");
        assert_eq!(report.entries[0].source.to_string(), "MRK.3.7");
    }

    #[test]
    fn test_into_collection_accepts_relations() {
        let collection = ingestor()
            .ingest_text(SAMPLE)
            .into_collection("References for tob");

        assert_eq!(collection.description.as_deref(), Some("References for tob"));
        assert_eq!(collection.cross_references.len(), 3);
        assert_eq!(collection.cross_references[0].source, "MRK.1.2");
        assert_eq!(
            collection.cross_references[0].notes.as_deref(),
            Some("Ml 3.1 ; Ex 23.20")
        );
        assert_eq!(collection.relation_count(), 5);
    }

    #[test]
    fn test_repair_inserts_tab() {
        let repaired = ingestor().repair_text("MARC 1 :\ny 1.315.41 Lc 3.4\n");
        assert_eq!(repaired, "MARC 1 :\ny 1.31\t5.41 Lc 3.4\n");
    }

    #[test]
    fn test_repair_keeps_other_lines() {
        let text = "preamble\r\nMARC 1 :\r\ny 1.2 Ml 3.1\r\nz 1.31\t5.41\r\nfree text";
        assert_eq!(ingestor().repair_text(text), text);
    }

    #[test]
    fn test_repair_is_idempotent() {
        let once = ingestor().repair_text("MARC 1 :\ny 1.315.41\n");
        let twice = ingestor().repair_text(&once);
        assert_eq!(once, "MARC 1 :\ny 1.31\t5.41\n");
        assert_eq!(twice, once);
    }

    #[test]
    fn test_custom_header_and_unknown_book() {
        let registry = Registry::bundled();
        let ingestor =
            NoteIngestor::new(&registry, "JHN", Some("JEAN"), VerseCounts::default()).unwrap();
        let report = ingestor.ingest_text("JEAN 3 :\n3.16 cf. 1 Jn 4.9\n");
        assert_eq!(report.entries[0].source.to_string(), "JHN.3.16");
        assert_eq!(report.entries[0].relations[0].target, "1JN.4.9");

        assert!(matches!(
            NoteIngestor::new(&registry, "XYZ", None, VerseCounts::default()),
            Err(IngestError::UnknownBook(_))
        ));
    }
}
