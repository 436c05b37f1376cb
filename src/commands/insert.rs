//! Insert one row from col=value pairs.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn execute(
    table: &str,
    values: &[String],
    db: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let (_, store) = super::open_store(db, config)?;
    store.ensure_default_schema()?;

    let pairs = parse_pairs(values)?;
    let coerced = store.coerce_row(table, &pairs)?;
    let message = store.insert_row(table, &coerced)?;
    println!("{} {message}", "✓".green());
    Ok(())
}

/// Split `col=value` arguments into pairs. The value may contain `=`;
/// only the first one splits.
fn parse_pairs(values: &[String]) -> Result<Vec<(String, String)>> {
    values
        .iter()
        .map(|item| match item.split_once('=') {
            Some((col, val)) if !col.trim().is_empty() => {
                Ok((col.trim().to_string(), val.to_string()))
            }
            _ => anyhow::bail!("Expected col=value, got '{item}'"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs(&["NAME=Alice".to_string(), "MARKS=85".to_string()]).unwrap();
        assert_eq!(pairs[0], ("NAME".to_string(), "Alice".to_string()));
        assert_eq!(pairs[1], ("MARKS".to_string(), "85".to_string()));
    }

    #[test]
    fn test_parse_pairs_value_may_contain_equals() {
        let pairs = parse_pairs(&["note=a=b".to_string()]).unwrap();
        assert_eq!(pairs[0], ("note".to_string(), "a=b".to_string()));
    }

    #[test]
    fn test_parse_pairs_empty_value_is_allowed() {
        let pairs = parse_pairs(&["SECTION=".to_string()]).unwrap();
        assert_eq!(pairs[0], ("SECTION".to_string(), String::new()));
    }

    #[test]
    fn test_parse_pairs_rejects_missing_equals() {
        assert!(parse_pairs(&["NAME".to_string()]).is_err());
        assert!(parse_pairs(&["=value".to_string()]).is_err());
    }
}
