//! Scalar value and row types returned by the connection capability.
//!
//! Row queries produce positional [`SqlValue`] scalars; the ledger maps them
//! into typed records through the accessors on [`Row`]. Accessors are
//! deliberately lenient where engines disagree on storage types (ClickHouse
//! keeps booleans in `Int8`, PostgreSQL has a native `boolean`).

use chrono::{DateTime, Utc};

use crate::error::{LedgerError, Result};

/// Owned scalar value produced by a row query.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (smallint).
    I16(i16),

    /// 32-bit signed integer (int).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// Text/string data.
    Text(String),

    /// UTC timestamp.
    DateTime(DateTime<Utc>),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        SqlValue::I16(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::DateTime(v)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

/// One result row: positional scalars with typed accessors.
#[derive(Debug, Clone, Default)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    /// Create a row from positional values.
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    /// Number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn value(&self, column: usize) -> Result<&SqlValue> {
        self.values.get(column).ok_or(LedgerError::RowDecode {
            column,
            expected: "present",
        })
    }

    /// Boolean accessor. Accepts native booleans and integer columns
    /// (non-zero is true) since columnar engines store flags as `Int8`.
    pub fn get_bool(&self, column: usize) -> Result<bool> {
        match self.value(column)? {
            SqlValue::Bool(v) => Ok(*v),
            SqlValue::I16(v) => Ok(*v != 0),
            SqlValue::I32(v) => Ok(*v != 0),
            SqlValue::I64(v) => Ok(*v != 0),
            _ => Err(LedgerError::RowDecode {
                column,
                expected: "a boolean",
            }),
        }
    }

    /// 16-bit integer accessor.
    pub fn get_i16(&self, column: usize) -> Result<i16> {
        match self.value(column)? {
            SqlValue::I16(v) => Ok(*v),
            _ => Err(LedgerError::RowDecode {
                column,
                expected: "a smallint",
            }),
        }
    }

    /// 32-bit integer accessor. Accepts smallint widening.
    pub fn get_i32(&self, column: usize) -> Result<i32> {
        match self.value(column)? {
            SqlValue::I16(v) => Ok(i32::from(*v)),
            SqlValue::I32(v) => Ok(*v),
            _ => Err(LedgerError::RowDecode {
                column,
                expected: "an integer",
            }),
        }
    }

    /// 64-bit integer accessor. Accepts any narrower integer.
    pub fn get_i64(&self, column: usize) -> Result<i64> {
        match self.value(column)? {
            SqlValue::I16(v) => Ok(i64::from(*v)),
            SqlValue::I32(v) => Ok(i64::from(*v)),
            SqlValue::I64(v) => Ok(*v),
            _ => Err(LedgerError::RowDecode {
                column,
                expected: "a bigint",
            }),
        }
    }

    /// Borrowed string accessor.
    pub fn get_str(&self, column: usize) -> Result<&str> {
        match self.value(column)? {
            SqlValue::Text(v) => Ok(v),
            _ => Err(LedgerError::RowDecode {
                column,
                expected: "text",
            }),
        }
    }

    /// Owned string accessor.
    pub fn get_string(&self, column: usize) -> Result<String> {
        self.get_str(column).map(str::to_string)
    }

    /// Nullable string accessor: NULL maps to `None`.
    pub fn opt_string(&self, column: usize) -> Result<Option<String>> {
        match self.value(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(v) => Ok(Some(v.clone())),
            _ => Err(LedgerError::RowDecode {
                column,
                expected: "text or null",
            }),
        }
    }

    /// Timestamp accessor.
    pub fn get_datetime(&self, column: usize) -> Result<DateTime<Utc>> {
        match self.value(column)? {
            SqlValue::DateTime(v) => Ok(*v),
            _ => Err(LedgerError::RowDecode {
                column,
                expected: "a timestamp",
            }),
        }
    }
}

impl From<Vec<SqlValue>> for Row {
    fn from(values: Vec<SqlValue>) -> Self {
        Row::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_typed_accessors() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let row = Row::new(vec![
            SqlValue::I32(7),
            SqlValue::Text("checksum".to_string()),
            SqlValue::Bool(true),
            SqlValue::DateTime(ts),
        ]);

        assert_eq!(row.get_i32(0).unwrap(), 7);
        assert_eq!(row.get_str(1).unwrap(), "checksum");
        assert!(row.get_bool(2).unwrap());
        assert_eq!(row.get_datetime(3).unwrap(), ts);
    }

    #[test]
    fn test_integer_widening() {
        let row = Row::new(vec![SqlValue::I16(4)]);
        assert_eq!(row.get_i16(0).unwrap(), 4);
        assert_eq!(row.get_i32(0).unwrap(), 4);
        assert_eq!(row.get_i64(0).unwrap(), 4);
    }

    #[test]
    fn test_bool_from_integer_column() {
        // ClickHouse stores success as Int8, surfaced here as I16
        let row = Row::new(vec![SqlValue::I16(1), SqlValue::I16(0)]);
        assert!(row.get_bool(0).unwrap());
        assert!(!row.get_bool(1).unwrap());
    }

    #[test]
    fn test_null_handling() {
        let row = Row::new(vec![SqlValue::Null, SqlValue::Text("1.2".to_string())]);
        assert!(row.value(0).unwrap().is_null());
        assert_eq!(row.opt_string(0).unwrap(), None);
        assert_eq!(row.opt_string(1).unwrap(), Some("1.2".to_string()));
    }

    #[test]
    fn test_decode_mismatch_errors() {
        let row = Row::new(vec![SqlValue::Text("not a number".to_string())]);
        let err = row.get_i64(0).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::RowDecode { column: 0, .. }
        ));

        // Out-of-range column
        assert!(row.get_str(5).is_err());
    }
}
