//! Terminal rendering of query results.

use colored::Colorize;

use crate::store::QueryOutput;

/// Longest cell content before truncation.
const MAX_CELL_WIDTH: usize = 60;

/// Print a result set as a column-aligned grid with a row-count footer.
/// Statements without a result set get a confirmation line instead.
pub fn print_table(output: &QueryOutput) {
    if output.columns.is_empty() {
        println!("{}", "Statement executed.".green());
        return;
    }
    if output.rows.is_empty() {
        println!("{}", "No results found.".dimmed());
        return;
    }
    let lines = grid_lines(output);
    let mut lines = lines.into_iter();
    if let Some(header) = lines.next() {
        println!("{}", header.bold());
    }
    for line in lines {
        println!("{line}");
    }
    println!(
        "{}",
        format!(
            "{} row{}",
            output.rows.len(),
            if output.rows.len() == 1 { "" } else { "s" }
        )
        .dimmed()
    );
}

/// The grid as plain lines: header, separator, then one line per row.
fn grid_lines(output: &QueryOutput) -> Vec<String> {
    let cells: Vec<Vec<String>> = output
        .rows
        .iter()
        .map(|row| row.iter().map(|v| clip(&v.to_string())).collect())
        .collect();

    let mut widths: Vec<usize> = output.columns.iter().map(|c| c.len()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let join_row = |row: &[String]| {
        row.iter()
            .enumerate()
            .map(|(i, cell)| {
                format!("{:<width$}", cell, width = widths.get(i).copied().unwrap_or(0))
            })
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let header_cells: Vec<String> = output.columns.to_vec();
    let header = join_row(&header_cells);
    let mut lines = vec![header.clone(), "-".repeat(header.len())];
    for row in &cells {
        lines.push(join_row(row));
    }
    lines
}

fn clip(cell: &str) -> String {
    if cell.chars().count() > MAX_CELL_WIDTH {
        let mut clipped: String = cell.chars().take(MAX_CELL_WIDTH - 3).collect();
        clipped.push_str("...");
        clipped
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Value;

    fn sample() -> QueryOutput {
        QueryOutput {
            columns: vec!["NAME".to_string(), "MARKS".to_string()],
            rows: vec![
                vec![Value::Text("Student1".into()), Value::Integer(90)],
                vec![Value::Text("S2".into()), Value::Integer(100)],
            ],
        }
    }

    #[test]
    fn test_grid_alignment() {
        let lines = grid_lines(&sample());
        assert_eq!(lines[0], "NAME     | MARKS");
        assert_eq!(lines[1], "----------------");
        assert_eq!(lines[2], "Student1 | 90   ");
        assert_eq!(lines[3], "S2       | 100  ");
        // Every line is the same width
        assert!(lines.iter().all(|l| l.len() == lines[0].len()));
    }

    #[test]
    fn test_grid_includes_nulls_as_blanks() {
        let output = QueryOutput {
            columns: vec!["a".to_string()],
            rows: vec![vec![Value::Null]],
        };
        let lines = grid_lines(&output);
        assert_eq!(lines[2], " ");
    }

    #[test]
    fn test_clip_long_cells() {
        let long = "x".repeat(100);
        let clipped = clip(&long);
        assert_eq!(clipped.chars().count(), MAX_CELL_WIDTH);
        assert!(clipped.ends_with("..."));
        assert_eq!(clip("short"), "short");
    }
}
