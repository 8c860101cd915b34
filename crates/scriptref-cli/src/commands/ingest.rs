//! Ingest command - Build a collection from annotation notes
//!
//! Reads a plain-text annotation file (chapter headers followed by
//! marker-prefixed notes), infers relations from each note and writes the
//! result as a `references_<nt|ot>_<name>.json` collection in the data
//! directory. An existing collection of the same name is replaced.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use scriptref_core::{
    bare_collection_name, collection_file_name, render_collection, write_collection, Testament,
};

use super::Session;

/// Arguments for the ingest command
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Annotation text file
    input: PathBuf,

    /// Book the notes belong to (defaults to ingest.default_book)
    #[arg(long, short = 'b')]
    book: Option<String>,

    /// Collection name to write
    #[arg(long, default_value = "tob")]
    collection: String,

    /// Chapter header label (defaults to the book's French name in capitals)
    #[arg(long)]
    header: Option<String>,

    /// Print the collection to stdout instead of writing it
    #[arg(long)]
    dry_run: bool,
}

/// Execute the ingest command
pub fn execute(args: IngestArgs, session: &Session) -> Result<()> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let registry = session.registry();
    let ingestor = session.ingestor(&registry, args.book.as_deref(), args.header.as_deref())?;
    let bare = bare_collection_name(&args.collection)?;

    let report = ingestor.ingest_text(&text);
    let entries = report.entries.len();
    let relations = report.relation_count();
    let skipped = report.skipped_lines;
    let collection = report.into_collection(format!("References for {bare}"));

    if args.dry_run {
        print!("{}", render_collection(&collection)?);
        return Ok(());
    }

    let path = session
        .data_dir()
        .join(collection_file_name(&bare, Testament::of(ingestor.book_code())));
    if path.exists() {
        tracing::info!("Replacing existing collection {:?}", path);
    }
    write_collection(&path, &collection)?;

    session.info(&format!(
        "Ingested {} entries ({} relations, {} lines skipped) into {}",
        entries,
        relations,
        skipped,
        path.display()
    ));
    Ok(())
}
