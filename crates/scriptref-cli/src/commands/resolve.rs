//! Resolve command - Normalize references to canonical form

use anyhow::Result;
use clap::Args;
use scriptref_core::{NormalizedRef, ReferenceParser};
use serde::Serialize;

use super::Session;

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// References to resolve (e.g. "Mc 1:1", "1 Co 8,12", "Gn 1")
    #[arg(required = true)]
    references: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// One resolved input.
#[derive(Debug, Serialize)]
struct Resolution<'a> {
    input: &'a str,
    #[serde(flatten)]
    reference: NormalizedRef,
    label: Option<&'a str>,
}

/// Execute the resolve command
pub fn execute(args: ResolveArgs, session: &Session) -> Result<()> {
    let registry = session.registry();
    let parser = ReferenceParser::new(&registry);

    let mut resolved = Vec::new();
    let mut unresolved = 0usize;
    for input in &args.references {
        match parser.normalize(input) {
            Some(reference) => {
                let label = registry
                    .book(&reference.book_code)
                    .map(|b| b.english_label.as_str());
                resolved.push(Resolution {
                    input,
                    reference,
                    label,
                });
            }
            None => {
                eprintln!("could not resolve: {}", input);
                unresolved += 1;
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    } else {
        for r in &resolved {
            match r.label {
                Some(label) => println!("{}\t{}\t{}", r.input, r.reference, label),
                None => println!("{}\t{}", r.input, r.reference),
            }
        }
    }

    if unresolved > 0 {
        anyhow::bail!(
            "{} of {} references could not be resolved",
            unresolved,
            args.references.len()
        );
    }
    Ok(())
}
