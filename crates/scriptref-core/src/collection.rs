//! On-disk cross-reference collection types.
//!
//! A collection file looks like:
//!
//! ```json
//! {
//!     "version": "1.0",
//!     "description": "References for tob",
//!     "cross_references": [
//!         {
//!             "source": "MRK.1.2",
//!             "notes": "Ml 3.1 ; Ex 23.20",
//!             "relations": [
//!                 { "target": "MAL.3.1", "type": "parallel", "note": "" }
//!             ]
//!         }
//!     ]
//! }
//! ```
//!
//! Keys this crate does not know about are kept in `extra` maps so that a
//! read-modify-write cycle does not drop them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version written into new collection files.
pub const COLLECTION_VERSION: &str = "1.0";

/// Kind of link between a source verse and its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationType {
    #[default]
    Parallel,
    Allusion,
    Quotation,
    /// Any type this crate does not recognize
    Other,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Parallel => "parallel",
            RelationType::Allusion => "allusion",
            RelationType::Quotation => "quotation",
            RelationType::Other => "other",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parallel" => Ok(RelationType::Parallel),
            "allusion" => Ok(RelationType::Allusion),
            "quotation" => Ok(RelationType::Quotation),
            "other" => Ok(RelationType::Other),
            _ => Err(format!(
                "Unknown relation type: {}. Valid options: parallel, allusion, quotation, other",
                s
            )),
        }
    }
}

// Files written by other tools may carry types we do not model.
impl From<String> for RelationType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or(RelationType::Other)
    }
}

impl From<RelationType> for String {
    fn from(value: RelationType) -> Self {
        value.as_str().to_string()
    }
}

/// One link from a source verse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// `BOOK.C.V`, `BOOK.C.V-V2` or `BOOK.C.V-BOOK.C.V`
    pub target: String,
    #[serde(rename = "type", default)]
    pub kind: RelationType,
    #[serde(default)]
    pub note: String,
}

impl Relation {
    pub fn new(target: impl Into<String>, kind: RelationType, note: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind,
            note: note.into(),
        }
    }

    /// Book code of the target.
    pub fn target_book(&self) -> &str {
        self.target.split('.').next().unwrap_or_default()
    }
}

/// All relations recorded for one source address in one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SourceEntry {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            notes: None,
            relations: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// A whole collection document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFile {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub cross_references: Vec<SourceEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_version() -> String {
    COLLECTION_VERSION.to_string()
}

impl CollectionFile {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            description: Some(description.into()),
            cross_references: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Entry for `source`, created at the end if missing.
    pub fn entry_mut(&mut self, source: &str) -> &mut SourceEntry {
        let index = match self.cross_references.iter().position(|e| e.source == source) {
            Some(index) => index,
            None => {
                self.cross_references.push(SourceEntry::new(source));
                self.cross_references.len() - 1
            }
        };
        &mut self.cross_references[index]
    }

    /// Total relations across all entries.
    pub fn relation_count(&self) -> usize {
        self.cross_references.iter().map(|e| e.relations.len()).sum()
    }
}
