//! Verse text lookup seam.
//!
//! Text corpora (Greek, Hebrew, French) live outside this crate. They plug in
//! through [`TextSource`]; [`lookup`] resolves a human reference and asks each
//! source in turn.

use std::fmt;

use tracing::debug;

use crate::reference::{CanonicalAddress, ReferenceParser};

/// A corpus able to return verse text for canonical addresses.
pub trait TextSource {
    /// Short corpus name, e.g. `"sblgnt"`
    fn name(&self) -> &str;

    /// Text of `address`, or `None` if the corpus does not cover it.
    fn text(&self, address: &CanonicalAddress) -> Option<String>;
}

/// Result of resolving and looking up a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The reference did not parse
    Unresolved { input: String },
    /// Parsed, but no source has text for it
    NotFound { address: CanonicalAddress },
    Found {
        address: CanonicalAddress,
        source: String,
        text: String,
    },
}

impl fmt::Display for LookupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupOutcome::Unresolved { input } => write!(f, "could not resolve: {input}"),
            LookupOutcome::NotFound { address } => write!(f, "{address}: no text available"),
            LookupOutcome::Found {
                address,
                source,
                text,
            } => write!(f, "{address} [{source}] {text}"),
        }
    }
}

/// Resolve `reference` and return the text of the first source that has it.
pub fn lookup(parser: &ReferenceParser<'_>, sources: &[&dyn TextSource], reference: &str) -> LookupOutcome {
    let Some(normalized) = parser.normalize(reference) else {
        return LookupOutcome::Unresolved {
            input: reference.to_string(),
        };
    };
    let address = normalized.address();

    for source in sources {
        if let Some(text) = source.text(&address) {
            return LookupOutcome::Found {
                address,
                source: source.name().to_string(),
                text,
            };
        }
        debug!("{} has no text for {}", source.name(), address);
    }
    LookupOutcome::NotFound { address }
}
