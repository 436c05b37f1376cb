//! Create a custom table from a column spec.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use askql::store::parse_column_spec;

pub fn execute(name: &str, columns: &str, db: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let (_, store) = super::open_store(db, config)?;
    store.ensure_default_schema()?;

    let defs = parse_column_spec(columns)?;
    let message = store.create_table(name, &defs)?;
    println!("{} {message}", "✓".green());
    Ok(())
}
