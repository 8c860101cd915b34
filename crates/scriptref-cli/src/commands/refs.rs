//! Refs command - List cross-references for a book, chapter or verse

use std::cmp::Ordering;

use anyhow::Result;
use clap::Args;
use scriptref_core::{CanonicalAddress, IndexEntry, ReferenceParser, Registry, Scope};
use serde::Serialize;

use super::{resolve_book, Session};

/// Arguments for the refs command
#[derive(Args, Debug)]
pub struct RefsArgs {
    /// Book (code or abbreviation), chapter or verse (e.g. "Mc", "Mc 1", "Mc 1:2")
    query: String,

    /// Collections to load: all, nt, ot, generic (defaults to store.default_scope)
    #[arg(long, short = 's')]
    scope: Option<Scope>,

    /// Only load collections whose file name contains this text
    #[arg(long)]
    source: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// One source address and everything recorded for it.
#[derive(Debug, Serialize)]
struct SourceRefs {
    source: String,
    #[serde(flatten)]
    entry: IndexEntry,
}

/// Execute the refs command
pub fn execute(args: RefsArgs, session: &Session) -> Result<()> {
    let registry = session.registry();
    let parser = ReferenceParser::new(&registry);
    let scope = match args.scope {
        Some(scope) => scope,
        None => session.default_scope()?,
    };

    let mut store = session.store();
    let summary = store.load_all(args.source.as_deref(), scope);
    tracing::debug!(
        "Loaded {} collections ({} skipped) from {:?}",
        summary.files_merged,
        summary.files_skipped,
        store.data_dir()
    );

    let mut rows: Vec<SourceRefs> = match parser.normalize(&args.query) {
        Some(reference) if reference.verse > 0 => store
            .get(&reference.canonical)
            .map(|entry| SourceRefs {
                source: reference.canonical.clone(),
                entry: entry.clone(),
            })
            .into_iter()
            .collect(),
        Some(reference) => {
            let prefix = format!("{}.", reference.canonical);
            store
                .get_references(&reference.book_code)
                .into_iter()
                .filter(|(source, _)| source.starts_with(&prefix) || *source == reference.canonical)
                .map(|(source, entry)| SourceRefs { source, entry })
                .collect()
        }
        None => {
            let code = resolve_book(&registry, args.query.trim())?;
            store
                .get_references(&code)
                .into_iter()
                .map(|(source, entry)| SourceRefs { source, entry })
                .collect()
        }
    };
    rows.sort_by(|a, b| canonical_order(&registry, &a.source, &b.source));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        session.info(&format!("No cross-references found for {} ({scope})", args.query));
        return Ok(());
    }

    for row in &rows {
        println!("{}", row.source);
        for note in &row.entry.notes {
            println!("  notes: {}", note);
        }
        for relation in &row.entry.relations {
            if relation.note.is_empty() {
                println!("  -> {} ({})", relation.target, relation.kind);
            } else {
                println!("  -> {} ({}) {}", relation.target, relation.kind, relation.note);
            }
        }
    }
    Ok(())
}

/// Book order, then numeric chapter and verse. Unparseable keys sort last.
fn canonical_order(registry: &Registry, a: &str, b: &str) -> Ordering {
    match (a.parse::<CanonicalAddress>(), b.parse::<CanonicalAddress>()) {
        (Ok(a), Ok(b)) => registry.compare(&a, &b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
