//! Data-access layer over a single SQLite file.
//!
//! The store holds a path, not a connection. Every operation opens a fresh
//! connection, runs one statement or one transactional batch, and closes.
//! Concurrent access is serialized by SQLite's own file locking.

use anyhow::{Context, Result};
use rusqlite::{params, Batch, Connection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod value;

pub use value::Value;

/// Name of the seeded default table.
pub const DEFAULT_TABLE: &str = "STUDENT";

/// Prefix for internal bookkeeping tables. These are hidden from listings
/// and from the schema description sent to the model.
const INTERNAL_PREFIX: &str = "_askql_";

const HISTORY_TABLE: &str = "_askql_history";

/// Sample records inserted when the default table is first created.
const SEED_ROWS: [(&str, &str, &str, i64); 5] = [
    ("Student1", "Data Science", "A", 90),
    ("Student2", "Data Science", "B", 100),
    ("Student3", "Data Science", "A", 86),
    ("Student4", "DEVOPS", "A", 50),
    ("Student5", "DEVOPS", "A", 35),
];

/// Column name plus its declared type, exactly as SQLite reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub decl_type: String,
}

/// A table name with its ordered columns.
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

/// Eagerly materialized result set. Statements that produce no result set
/// come back with an empty column list.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// One recorded question/SQL round trip.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub asked_at: String,
    pub question: String,
    pub sql: String,
    pub ok: bool,
    pub detail: String,
}

/// Handle on the database file. Cheap to clone; owns no connection.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Store { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }
        Connection::open(&self.path)
            .with_context(|| format!("Failed to open database: {}", self.path.display()))
    }

    /// Create the seeded default table and the history table if missing.
    /// Idempotent; returns true when the default table was created now.
    pub fn ensure_default_schema(&self) -> Result<bool> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {HISTORY_TABLE} (
                    asked_at TEXT NOT NULL,
                    question TEXT NOT NULL,
                    sql      TEXT NOT NULL,
                    ok       INTEGER NOT NULL,
                    detail   TEXT NOT NULL DEFAULT ''
                )"
            ),
            [],
        )
        .context("Failed to create history table")?;

        let seeded = if table_exists(&tx, DEFAULT_TABLE)? {
            false
        } else {
            tx.execute(
                &format!(
                    "CREATE TABLE {DEFAULT_TABLE} (
                        NAME    VARCHAR(25),
                        COURSE  VARCHAR(25),
                        SECTION VARCHAR(25),
                        MARKS   INT
                    )"
                ),
                [],
            )
            .context("Failed to create default table")?;
            for (name, course, section, marks) in SEED_ROWS {
                tx.execute(
                    &format!(
                        "INSERT INTO {DEFAULT_TABLE} (NAME, COURSE, SECTION, MARKS)
                         VALUES (?1, ?2, ?3, ?4)"
                    ),
                    params![name, course, section, marks],
                )?;
            }
            true
        };

        tx.commit().context("Failed to initialize database")?;
        Ok(seeded)
    }

    /// Create a table from caller-supplied definitions.
    ///
    /// The statement is assembled by direct interpolation: names and types
    /// land in the DDL exactly as typed, and malformed ones come back as
    /// engine errors.
    pub fn create_table(&self, name: &str, columns: &[ColumnDef]) -> Result<String> {
        if name.trim().is_empty() {
            anyhow::bail!("Table name is empty");
        }
        if columns.is_empty() {
            anyhow::bail!("No columns given for table '{name}'");
        }
        let defs = columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.decl_type))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("CREATE TABLE IF NOT EXISTS {name} ({defs})");

        let conn = self.connect()?;
        conn.execute(&sql, [])
            .with_context(|| format!("Failed to create table '{name}'"))?;
        Ok(format!("Table '{name}' created"))
    }

    /// Names of user-visible tables, in catalog order.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        visible_tables(&conn)
    }

    /// Ordered column definitions for a table. Empty when the table does
    /// not exist.
    pub fn table_columns(&self, table: &str) -> Result<Vec<ColumnDef>> {
        let conn = self.connect()?;
        columns_of(&conn, table)
    }

    /// Every visible table with its columns.
    pub fn tables_with_columns(&self) -> Result<Vec<TableInfo>> {
        let conn = self.connect()?;
        let names = visible_tables(&conn)?;
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = columns_of(&conn, &name)?;
            tables.push(TableInfo { name, columns });
        }
        Ok(tables)
    }

    /// One line per visible table, formatted for the model prompt:
    /// `- NAME: col (TYPE), col (TYPE)`.
    pub fn schema_summary(&self) -> Result<String> {
        let tables = self.tables_with_columns()?;
        let lines: Vec<String> = tables
            .iter()
            .map(|t| {
                let cols = t
                    .columns
                    .iter()
                    .map(|c| format!("{} ({})", c.name, c.decl_type))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("- {}: {}", t.name, cols)
            })
            .collect();
        Ok(lines.join("\n"))
    }

    /// Execute caller-supplied SQL verbatim and materialize the result.
    ///
    /// No validation and no parameter binding: the text is trusted operator
    /// input and only the engine gets to reject it. One statement per call;
    /// input carrying a second statement is rejected before the first one
    /// runs. Trailing semicolons and comments are fine.
    pub fn run_query(&self, sql: &str) -> Result<QueryOutput> {
        let conn = self.connect()?;
        let mut batch = Batch::new(&conn, sql);
        let mut stmt = batch
            .next()
            .with_context(|| format!("Failed to prepare SQL: {sql}"))?
            .ok_or_else(|| anyhow::anyhow!("No SQL statement found in the input"))?;
        if !matches!(batch.next(), Ok(None)) {
            anyhow::bail!("Only one SQL statement can be executed at a time: {sql}");
        }
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let mut out = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let v: rusqlite::types::Value = row.get(i)?;
                cells.push(Value::from(v));
            }
            out.push(cells);
        }
        Ok(QueryOutput { columns, rows: out })
    }

    /// Coerce raw text values according to the table's declared column
    /// types. Columns the table does not declare stay text, leaving the
    /// engine to reject the unknown name.
    pub fn coerce_row(
        &self,
        table: &str,
        pairs: &[(String, String)],
    ) -> Result<Vec<(String, Value)>> {
        let declared = self.table_columns(table)?;
        pairs
            .iter()
            .map(|(col, raw)| {
                let decl = declared
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(col))
                    .map(|c| c.decl_type.as_str())
                    .unwrap_or("TEXT");
                Ok((col.clone(), Value::coerce(raw, decl)?))
            })
            .collect()
    }

    /// Insert one row. Column names come from the pair keys and are
    /// interpolated; values are bound as parameters.
    pub fn insert_row(&self, table: &str, values: &[(String, Value)]) -> Result<String> {
        if values.is_empty() {
            anyhow::bail!("No values given for table '{table}'");
        }
        let columns = values
            .iter()
            .map(|(c, _)| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=values.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})");

        let conn = self.connect()?;
        conn.execute(&sql, rusqlite::params_from_iter(values.iter().map(|(_, v)| v)))
            .with_context(|| format!("Failed to insert into '{table}'"))?;
        Ok(format!("1 row inserted into '{table}'"))
    }

    /// Append one question/SQL round trip to the history table.
    pub fn record_ask(&self, question: &str, sql: &str, ok: bool, detail: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            &format!(
                "INSERT INTO {HISTORY_TABLE} (asked_at, question, sql, ok, detail)
                 VALUES (?1, ?2, ?3, ?4, ?5)"
            ),
            params![chrono::Utc::now().to_rfc3339(), question, sql, ok, detail],
        )
        .context("Failed to record history")?;
        Ok(())
    }

    /// Most recent history entries, newest first.
    pub fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT asked_at, question, sql, ok, detail FROM {HISTORY_TABLE}
                 ORDER BY rowid DESC LIMIT ?1"
            ))
            .context("Failed to read history")?;
        let entries = stmt
            .query_map(params![limit as i64], |row| {
                Ok(HistoryEntry {
                    asked_at: row.get(0)?,
                    question: row.get(1)?,
                    sql: row.get(2)?,
                    ok: row.get::<_, i64>(3)? != 0,
                    detail: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

/// Parse a comma-separated column spec like `"name TEXT, age INTEGER"`.
///
/// Each item is `name TYPE...`; extra tokens stay part of the type.
pub fn parse_column_spec(spec: &str) -> Result<Vec<ColumnDef>> {
    let mut columns = Vec::new();
    for item in spec.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let mut tokens = item.split_whitespace();
        let name = tokens.next().unwrap_or_default().to_string();
        let decl_type = tokens.collect::<Vec<_>>().join(" ");
        if decl_type.is_empty() {
            anyhow::bail!("Column '{name}' is missing a type (expected 'name TYPE')");
        }
        columns.push(ColumnDef { name, decl_type });
    }
    if columns.is_empty() {
        anyhow::bail!("Empty column spec (expected e.g. 'name TEXT, age INTEGER')");
    }
    Ok(columns)
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    Ok(stmt.exists(params![name])?)
}

fn visible_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
        .context("Failed to list tables")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names
        .into_iter()
        .filter(|n| !n.starts_with(INTERNAL_PREFIX) && !n.starts_with("sqlite_"))
        .collect())
}

fn columns_of(conn: &Connection, table: &str) -> Result<Vec<ColumnDef>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("Failed to inspect table '{table}'"))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnDef {
                name: row.get(1)?,
                decl_type: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}
