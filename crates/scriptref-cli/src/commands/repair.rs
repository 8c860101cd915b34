//! Repair command - Insert the missing tab after note markers

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::Session;

/// Arguments for the repair command
#[derive(Args, Debug)]
pub struct RepairArgs {
    /// Annotation text file
    input: PathBuf,

    /// Book the notes belong to (defaults to ingest.default_book)
    #[arg(long, short = 'b')]
    book: Option<String>,

    /// Chapter header label (defaults to the book's French name in capitals)
    #[arg(long)]
    header: Option<String>,

    /// Rewrite the input file instead of printing to stdout
    #[arg(long, short = 'i')]
    in_place: bool,
}

/// Execute the repair command
pub fn execute(args: RepairArgs, session: &Session) -> Result<()> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let registry = session.registry();
    let ingestor = session.ingestor(&registry, args.book.as_deref(), args.header.as_deref())?;
    let repaired = ingestor.repair_text(&text);

    let changed = text
        .lines()
        .zip(repaired.lines())
        .filter(|(before, after)| before != after)
        .count();

    if !args.in_place {
        print!("{}", repaired);
    } else if changed > 0 {
        std::fs::write(&args.input, &repaired)
            .with_context(|| format!("Failed to write {}", args.input.display()))?;
    }

    session.info(&format!("Repaired {} lines in {}", changed, args.input.display()));
    Ok(())
}
