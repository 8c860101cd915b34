//! Add command - Record a relation in a collection file

use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Args;
use scriptref_core::{ReferenceParser, RelationType, StoreError};

use super::Session;

/// Arguments for the add command
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Collection name (e.g. "tob"; the testament prefix is chosen from the source)
    collection: String,

    /// Source reference (e.g. "Mc 1:2")
    source: String,

    /// Target reference or range (e.g. "Ml 3:1", "Mc 8:29-30")
    target: String,

    /// Relation type (parallel, allusion, quotation, other)
    #[arg(
        long = "type",
        short = 't',
        default_value = "parallel",
        value_parser = RelationType::from_str
    )]
    kind: RelationType,

    /// Free-text note stored with the relation
    #[arg(long, short = 'n', default_value = "")]
    note: String,
}

/// Execute the add command
pub fn execute(args: AddArgs, session: &Session) -> Result<()> {
    let registry = session.registry();
    let parser = ReferenceParser::new(&registry);
    let store = session.store();

    let path = match store.add_relation(
        &parser,
        &args.collection,
        &args.source,
        &args.target,
        args.kind,
        &args.note,
    ) {
        Ok(path) => path,
        Err(StoreError::InvalidReference { role, input }) => {
            anyhow::bail!("could not resolve: {} ({} reference)", input, role)
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to update collection '{}'", args.collection))
        }
    };

    session.info(&format!(
        "Added {} -> {} ({}) to {}",
        args.source,
        args.target,
        args.kind,
        path.display()
    ));
    println!("{}", path.display());
    Ok(())
}
