//! Recent question/SQL history.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn execute(
    limit: usize,
    json_output: bool,
    db: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let (_, store) = super::open_store(db, config)?;
    store.ensure_default_schema()?;

    let entries = store.recent_history(limit)?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No history yet.");
        return Ok(());
    }
    for entry in &entries {
        let marker = if entry.ok {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "{} {} {}",
            marker,
            entry.asked_at.dimmed(),
            entry.question.bold()
        );
        println!("    {}", entry.sql);
        if !entry.detail.is_empty() {
            println!("    {}", entry.detail.dimmed());
        }
    }
    Ok(())
}
