//! Audit command - Flag relations whose note text names another book

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use scriptref_core::{audit_entries, read_collection};

use super::{resolve_book, Session};

/// Arguments for the audit command
#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Collection file to audit
    collection_file: PathBuf,

    /// Book the collection was ingested for (defaults to ingest.default_book)
    #[arg(long, short = 'b')]
    book: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the audit command
pub fn execute(args: AuditArgs, session: &Session) -> Result<()> {
    let registry = session.registry();
    let book = resolve_book(
        &registry,
        args.book.as_deref().unwrap_or(session.config.ingest.default_book.as_str()),
    )?;

    let collection = read_collection(&args.collection_file)
        .with_context(|| format!("Failed to read {}", args.collection_file.display()))?
        .ok_or_else(|| {
            anyhow::anyhow!("Collection not found: {}", args.collection_file.display())
        })?;

    let findings = audit_entries(&registry, &book, &collection.cross_references);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&findings)?);
        return Ok(());
    }

    for finding in &findings {
        println!("{}", finding);
    }
    session.info(&format!(
        "{} suspicious relations in {}",
        findings.len(),
        args.collection_file.display()
    ));
    Ok(())
}
