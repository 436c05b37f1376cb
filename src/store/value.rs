//! Dynamically typed cell values, one variant per SQLite storage class.

use anyhow::Result;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::ToSql;
use serde::{Serialize, Serializer};
use std::fmt;

/// A single cell value as stored by SQLite.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Coerce raw text input according to a column's declared type.
    ///
    /// Loose affinity match: INT-ish declarations parse as integers,
    /// REAL/NUMERIC-ish as floats, everything else stays text.
    pub fn coerce(raw: &str, declared_type: &str) -> Result<Value> {
        let decl = declared_type.to_uppercase();
        if decl.contains("INT") {
            let n: i64 = raw.trim().parse().map_err(|_| {
                anyhow::anyhow!("'{raw}' is not an integer (column type {declared_type})")
            })?;
            Ok(Value::Integer(n))
        } else if ["REAL", "FLOA", "DOUB", "NUMERIC", "DEC"]
            .iter()
            .any(|t| decl.contains(t))
        {
            let f: f64 = raw.trim().parse().map_err(|_| {
                anyhow::anyhow!("'{raw}' is not a number (column type {declared_type})")
            })?;
            Ok(Value::Real(f))
        } else {
            Ok(Value::Text(raw.to_string()))
        }
    }
}

impl From<SqlValue> for Value {
    fn from(v: SqlValue) -> Self {
        match v {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::Integer(i),
            SqlValue::Real(f) => Value::Real(f),
            SqlValue::Text(s) => Value::Text(s),
            SqlValue::Blob(b) => Value::Blob(b),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(r) => serializer.serialize_f64(*r),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Blob(b) => serializer.serialize_bytes(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_integer_column() {
        assert_eq!(Value::coerce("85", "INT").unwrap(), Value::Integer(85));
        assert_eq!(
            Value::coerce(" 42 ", "INTEGER").unwrap(),
            Value::Integer(42)
        );
    }

    #[test]
    fn test_coerce_real_column() {
        assert_eq!(Value::coerce("3.5", "REAL").unwrap(), Value::Real(3.5));
        assert_eq!(Value::coerce("90", "NUMERIC").unwrap(), Value::Real(90.0));
    }

    #[test]
    fn test_coerce_text_column_keeps_input() {
        assert_eq!(
            Value::coerce("Data Science", "VARCHAR(25)").unwrap(),
            Value::Text("Data Science".to_string())
        );
        // Empty text is allowed; the column type decides
        assert_eq!(Value::coerce("", "TEXT").unwrap(), Value::Text(String::new()));
    }

    #[test]
    fn test_coerce_rejects_non_numeric_input() {
        let err = Value::coerce("ninety", "INT").unwrap_err();
        assert!(err.to_string().contains("ninety"));
        assert!(Value::coerce("", "REAL").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Integer(90).to_string(), "90");
        assert_eq!(Value::Text("A".into()).to_string(), "A");
        assert_eq!(Value::Blob(vec![1, 2, 3]).to_string(), "<blob 3 bytes>");
    }

    #[test]
    fn test_from_sql_value() {
        assert_eq!(Value::from(SqlValue::Integer(7)), Value::Integer(7));
        assert_eq!(Value::from(SqlValue::Null), Value::Null);
        assert_eq!(
            Value::from(SqlValue::Text("x".into())),
            Value::Text("x".into())
        );
    }

    #[test]
    fn test_json_serialization() {
        let row = vec![
            Value::Null,
            Value::Integer(1),
            Value::Text("a".into()),
            Value::Real(0.5),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[null,1,"a",0.5]"#);
    }
}
