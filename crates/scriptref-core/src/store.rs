//! Cross-reference store
//!
//! Merges every `references_*.json` collection of a data directory into one
//! in-memory index keyed by canonical source address, and appends relations
//! to a named collection file.
//!
//! ## File scopes
//!
//! | File name                    | Scope   |
//! |------------------------------|---------|
//! | `references_nt_<name>.json`  | Nt      |
//! | `references_ot_<name>.json`  | Ot      |
//! | `references_<name>.json`     | Generic |
//!
//! ## Writers
//!
//! Collection files are rewritten whole. There is no locking: callers must
//! not run two writers against the same data directory at once. Writing
//! never refreshes the in-memory index; call [`CrossRefStore::load_all`]
//! again to see new relations.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collection::{CollectionFile, Relation, RelationType};
use crate::reference::ReferenceParser;
use crate::registry::Testament;

/// File name prefix of every collection.
pub const COLLECTION_PREFIX: &str = "references_";

/// Which argument of an operation failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceRole {
    Source,
    Target,
}

impl fmt::Display for ReferenceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceRole::Source => write!(f, "source"),
            ReferenceRole::Target => write!(f, "target"),
        }
    }
}

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A source or target reference did not resolve
    #[error("invalid {role} reference: '{input}'")]
    InvalidReference { role: ReferenceRole, input: String },

    /// Collection name is empty after normalization or contains a path
    #[error("invalid collection name: '{0}'")]
    InvalidCollectionName(String),

    #[error("failed to read collection '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Existing collection is not valid JSON of the expected shape
    #[error("malformed collection '{path}': {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write collection '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize collection: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub fn invalid_reference(role: ReferenceRole, input: impl Into<String>) -> Self {
        Self::InvalidReference {
            role,
            input: input.into(),
        }
    }

    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFile {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Malformed {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Scope a collection file applies to, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileScope {
    Nt,
    Ot,
    Generic,
}

impl FileScope {
    /// Classify a collection by file name.
    pub fn classify(file_name: &str) -> Self {
        if file_name.contains("_nt_") {
            FileScope::Nt
        } else if file_name.contains("_ot_") {
            FileScope::Ot
        } else {
            FileScope::Generic
        }
    }
}

/// Which collections a load selects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    All,
    /// New-Testament and generic collections
    Nt,
    /// Old-Testament and generic collections
    Ot,
    /// Generic collections only
    Generic,
}

impl Scope {
    pub fn includes(&self, file_scope: FileScope) -> bool {
        match self {
            Scope::All => true,
            Scope::Nt => matches!(file_scope, FileScope::Nt | FileScope::Generic),
            Scope::Ot => matches!(file_scope, FileScope::Ot | FileScope::Generic),
            Scope::Generic => file_scope == FileScope::Generic,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => write!(f, "all"),
            Scope::Nt => write!(f, "nt"),
            Scope::Ot => write!(f, "ot"),
            Scope::Generic => write!(f, "generic"),
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Scope::All),
            "nt" => Ok(Scope::Nt),
            "ot" => Ok(Scope::Ot),
            "generic" => Ok(Scope::Generic),
            _ => Err(format!(
                "Unknown scope: {}. Valid options: all, nt, ot, generic",
                s
            )),
        }
    }
}

/// Merged view of one source address across collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    /// Distinct non-empty notes, in merge order
    pub notes: Vec<String>,
    /// Every relation, in merge order
    pub relations: Vec<Relation>,
}

/// Outcome of a [`CrossRefStore::load_all`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub files_merged: usize,
    pub files_skipped: usize,
    pub entries: usize,
}

/// In-memory cross-reference index over a data directory.
#[derive(Debug, Clone)]
pub struct CrossRefStore {
    data_dir: PathBuf,
    index: HashMap<String, IndexEntry>,
    loaded_files: Vec<PathBuf>,
}

impl CrossRefStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            index: HashMap::new(),
            loaded_files: Vec::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Read-only view of the index.
    pub fn index(&self) -> &HashMap<String, IndexEntry> {
        &self.index
    }

    /// Files merged by the last load, in merge order.
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded_files
    }

    /// Collection files of the data directory, sorted by file name.
    pub fn discover(&self) -> Vec<PathBuf> {
        let dir = glob::Pattern::escape(&self.data_dir.to_string_lossy());
        let pattern = Path::new(&dir)
            .join(format!("{COLLECTION_PREFIX}*.json"))
            .to_string_lossy()
            .into_owned();

        let paths = match glob::glob(&pattern) {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Invalid collection pattern {}: {}", pattern, e);
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    debug!("Skipping unreadable collection entry: {}", e);
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        files
    }

    /// Rebuild the index from the collections selected by `scope` and
    /// `source_filter`.
    ///
    /// Missing and malformed files are skipped; the rest still merge.
    pub fn load_all(&mut self, source_filter: Option<&str>, scope: Scope) -> LoadSummary {
        self.index.clear();
        self.loaded_files.clear();
        let mut summary = LoadSummary::default();

        if !self.data_dir.is_dir() {
            warn!("Data directory not found: {:?}", self.data_dir);
            return summary;
        }

        for path in self.discover() {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            if !scope.includes(FileScope::classify(&file_name)) {
                debug!("Skipping {} (outside scope {})", file_name, scope);
                continue;
            }
            if let Some(filter) = source_filter {
                if !file_name.contains(filter) {
                    debug!("Skipping {} (does not match '{}')", file_name, filter);
                    continue;
                }
            }

            match read_collection(&path) {
                Ok(Some(collection)) => {
                    let merged = self.merge(collection);
                    debug!("Merged {} entries from {}", merged, file_name);
                    self.loaded_files.push(path);
                    summary.files_merged += 1;
                }
                Ok(None) => {
                    debug!("Collection vanished before reading: {:?}", path);
                    summary.files_skipped += 1;
                }
                Err(e) => {
                    warn!("Skipping collection: {}", e);
                    summary.files_skipped += 1;
                }
            }
        }

        summary.entries = self.index.len();
        info!(
            "Loaded {} collections ({} skipped), {} source entries",
            summary.files_merged, summary.files_skipped, summary.entries
        );
        summary
    }

    fn merge(&mut self, collection: CollectionFile) -> usize {
        let count = collection.cross_references.len();
        for entry in collection.cross_references {
            let indexed = self.index.entry(entry.source).or_default();
            if let Some(notes) = entry.notes {
                if !notes.is_empty() && !indexed.notes.contains(&notes) {
                    indexed.notes.push(notes);
                }
            }
            indexed.relations.extend(entry.relations);
        }
        count
    }

    /// Index entry for one canonical source address.
    pub fn get(&self, source: &str) -> Option<&IndexEntry> {
        self.index.get(source)
    }

    /// All entries whose source lies in `book_code`, sorted by key.
    pub fn get_references(&self, book_code: &str) -> BTreeMap<String, IndexEntry> {
        let prefix = format!("{book_code}.");
        self.index
            .iter()
            .filter(|(source, _)| source.starts_with(&prefix))
            .map(|(source, entry)| (source.clone(), entry.clone()))
            .collect()
    }

    /// Append a relation to a named collection file.
    ///
    /// The source is normalized with [`ReferenceParser::normalize`] and the
    /// target with [`ReferenceParser::parse_target`]. The file is chosen by
    /// the testament of the source book and rewritten whole. Returns the
    /// path written.
    pub fn add_relation(
        &self,
        parser: &ReferenceParser<'_>,
        collection: &str,
        source: &str,
        target: &str,
        kind: RelationType,
        note: &str,
    ) -> Result<PathBuf> {
        let source_ref = parser
            .normalize(source)
            .ok_or_else(|| StoreError::invalid_reference(ReferenceRole::Source, source))?;
        let target_ref = parser
            .parse_target(target)
            .ok_or_else(|| StoreError::invalid_reference(ReferenceRole::Target, target))?;

        let bare = bare_collection_name(collection)?;
        let testament = Testament::of(&source_ref.book_code);
        let path = self.data_dir.join(collection_file_name(&bare, testament));

        let mut document = match read_collection(&path)? {
            Some(document) => document,
            None => CollectionFile::new(format!("References for {bare}")),
        };

        document
            .entry_mut(&source_ref.canonical)
            .relations
            .push(Relation::new(target_ref.to_string(), kind, note));

        write_collection(&path, &document)?;
        info!(
            "Added {} -> {} ({}) to {:?}",
            source_ref.canonical, target_ref, kind, path
        );
        Ok(path)
    }
}

/// Strip `references_`, `.json` and any `ot_`/`nt_` marker from a
/// collection name.
pub fn bare_collection_name(collection: &str) -> Result<String> {
    let name = collection.trim();
    let name = name.strip_suffix(".json").unwrap_or(name);
    let name = name.strip_prefix(COLLECTION_PREFIX).unwrap_or(name);
    let name = name
        .strip_prefix("ot_")
        .or_else(|| name.strip_prefix("nt_"))
        .unwrap_or(name);

    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(StoreError::InvalidCollectionName(collection.to_string()));
    }
    Ok(name.to_string())
}

/// File name for a bare collection name and source testament.
pub fn collection_file_name(bare: &str, testament: Testament) -> String {
    match testament {
        Testament::Old => format!("{COLLECTION_PREFIX}ot_{bare}.json"),
        Testament::New => format!("{COLLECTION_PREFIX}nt_{bare}.json"),
        Testament::Neither => format!("{COLLECTION_PREFIX}{bare}.json"),
    }
}

/// Read a collection file. A missing file is `Ok(None)`.
pub fn read_collection(path: &Path) -> Result<Option<CollectionFile>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::read_file(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::malformed(path, e))
}

/// Render a collection exactly as [`write_collection`] stores it:
/// 4-space-indented JSON with a trailing newline.
pub fn render_collection(collection: &CollectionFile) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    collection.serialize(&mut serializer)?;
    buffer.push(b'\n');

    // serde_json only emits UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Write a collection file as 4-space-indented UTF-8 JSON.
///
/// Creates the parent directory if needed.
pub fn write_collection(path: &Path, collection: &CollectionFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::write_file(parent, e))?;
        }
    }

    let rendered = render_collection(collection)?;
    std::fs::write(path, rendered).map_err(|e| StoreError::write_file(path, e))
}
