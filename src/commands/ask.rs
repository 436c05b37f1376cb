//! Ask an English question, translate it to SQL, run it, show the rows.

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::path::Path;

use askql::llm::GroqClient;
use askql::render;

/// Returns the process exit code. The generated SQL is always shown (and
/// recorded in history) even when executing it fails; that failure is exit
/// code 1 rather than an error, so the SQL survives on screen.
pub fn execute(
    question: &str,
    no_execute: bool,
    model: Option<&str>,
    json_output: bool,
    db: Option<&Path>,
    config: Option<&Path>,
) -> Result<i32> {
    let (config, store) = super::open_store(db, config)?;
    store.ensure_default_schema()?;

    let mut settings = config.llm_settings();
    if let Some(model) = model {
        settings.model = model.to_string();
    }
    let client = GroqClient::new(settings)?;

    let schema = store.schema_summary()?;
    let sql = client.text_to_sql(question, &schema)?;

    if no_execute {
        store.record_ask(question, &sql, true, "not executed")?;
        if json_output {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({"question": question, "sql": sql}))?
            );
        } else {
            print_sql(&sql);
        }
        return Ok(0);
    }

    match store.run_query(&sql) {
        Ok(output) => {
            let detail = format!("{} row(s)", output.rows.len());
            store.record_ask(question, &sql, true, &detail)?;
            if json_output {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "question": question,
                        "sql": sql,
                        "columns": output.columns,
                        "rows": output.rows,
                    }))?
                );
            } else {
                print_sql(&sql);
                println!();
                render::print_table(&output);
            }
            Ok(0)
        }
        Err(e) => {
            store.record_ask(question, &sql, false, &format!("{e:#}"))?;
            if json_output {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "question": question,
                        "sql": sql,
                        "error": format!("{e:#}"),
                    }))?
                );
            } else {
                print_sql(&sql);
                println!();
                eprintln!("{} {e:#}", "✗ SQL failed:".red().bold());
            }
            Ok(1)
        }
    }
}

fn print_sql(sql: &str) {
    println!("{}", "Generated SQL:".bold());
    println!("{}", sql.cyan());
}
