//! Table listing and introspection.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn execute_list(json_output: bool, db: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let (_, store) = super::open_store(db, config)?;
    store.ensure_default_schema()?;

    let tables = store.tables_with_columns()?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&tables)?);
        return Ok(());
    }
    for table in &tables {
        let columns = table
            .columns
            .iter()
            .map(|c| format!("{} ({})", c.name, c.decl_type))
            .collect::<Vec<_>>()
            .join(", ");
        println!("{}  {}", table.name.bold(), columns.dimmed());
    }
    Ok(())
}

/// Missing tables print an info line and exit zero, matching the store's
/// empty-introspection contract.
pub fn execute_describe(
    table: &str,
    json_output: bool,
    db: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let (_, store) = super::open_store(db, config)?;
    store.ensure_default_schema()?;

    let columns = store.table_columns(table)?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&columns)?);
        return Ok(());
    }
    if columns.is_empty() {
        println!("No such table: {table}");
        return Ok(());
    }
    println!("{}", table.bold());
    for column in &columns {
        println!("  {}  {}", column.name, column.decl_type.dimmed());
    }
    Ok(())
}
