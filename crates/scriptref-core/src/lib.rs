//! Scriptref Core - Scripture reference resolution and cross-reference storage
//!
//! This crate provides the core functionality for working with scripture
//! references:
//! - Book identity registry unifying French and English abbreviations
//! - Reference parsing to canonical `BOOK.C.V` addresses
//! - Note tokenization and digit-run disambiguation for annotation text
//! - Cross-reference collections merged across files and scopes
//! - Annotation ingestion, relation audit and a verse text lookup seam

pub mod audit;
pub mod collection;
pub mod disambiguate;
pub mod ingest;
pub mod lookup;
pub mod reference;
pub mod registry;
pub mod store;
pub mod tokenizer;

// Registry re-exports
pub use registry::{
    internal_key_for, BookMetadata, BookTableEntry, LanguageEntry, Registry, RegistryError,
    SurfaceCollision, Testament, BUNDLED_BOOK_TABLE, NEW_TESTAMENT, OLD_TESTAMENT,
};

// Reference re-exports
pub use reference::{
    AddressParseError, CanonicalAddress, NormalizedRef, RangeEnd, ReferenceParser, RelationTarget,
};

// Tokenizer and disambiguation re-exports
pub use disambiguate::{longest_valid_verse, VerseCounts, VerseGuess, DEFAULT_MAX_VERSE};
pub use tokenizer::{normalize_spaces, InferredRelation, NoteTokenizer, TokenizerError};

// Store re-exports
pub use collection::{CollectionFile, Relation, RelationType, SourceEntry, COLLECTION_VERSION};
pub use store::{
    bare_collection_name, collection_file_name, read_collection, render_collection,
    write_collection, CrossRefStore, FileScope, IndexEntry, LoadSummary, ReferenceRole, Scope,
    StoreError,
};

// Ingestion, audit and lookup re-exports
pub use audit::{audit_entries, AuditFinding};
pub use ingest::{IngestError, IngestReport, IngestedEntry, NoteIngestor};
pub use lookup::{lookup, LookupOutcome, TextSource};
