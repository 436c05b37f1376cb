//! Execute a SQL statement verbatim.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use askql::render;

pub fn execute(
    statement: Option<&str>,
    json_output: bool,
    db: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let (_, store) = super::open_store(db, config)?;
    store.ensure_default_schema()?;

    let sql = match statement {
        Some(s) => s.to_string(),
        None => read_stdin()?,
    };
    let sql = sql.trim();
    if sql.is_empty() {
        anyhow::bail!("Empty SQL statement");
    }

    let output = store.run_query(sql)?;
    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "columns": output.columns,
                "rows": output.rows,
            }))?
        );
    } else {
        render::print_table(&output);
    }
    Ok(())
}

fn read_stdin() -> Result<String> {
    if atty::is(atty::Stream::Stdin) {
        anyhow::bail!("No statement given (pass it as an argument or pipe it on stdin)");
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read SQL from stdin")?;
    Ok(buf)
}
