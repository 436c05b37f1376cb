//! Initialize the database with the seeded default table.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use askql::store::DEFAULT_TABLE;

pub fn execute(db: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let (_, store) = super::open_store(db, config)?;
    let seeded = store.ensure_default_schema()?;
    if seeded {
        println!(
            "{} {} with seeded {DEFAULT_TABLE} table (5 rows)",
            "✓ Created".green().bold(),
            store.path().display()
        );
    } else {
        println!(
            "{} already initialized ({DEFAULT_TABLE} table present)",
            store.path().display()
        );
    }
    Ok(())
}
