//! ClickHouse statement splitter.
//!
//! The minimal contract: split on a fixed delimiter, trim, drop empties.
//! This is unsafe when a string literal contains the delimiter character;
//! engines needing that guarantee get a quote-aware splitter instead (see
//! the PostgreSQL dialect). ClickHouse commits each statement immediately,
//! so nothing is ever enlisted in a transaction.

use crate::dialect::{SqlStatement, StatementSplitter};

const DELIMITER: char = ';';

/// Fixed-delimiter splitter for ClickHouse scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickhouseSplitter;

impl StatementSplitter for ClickhouseSplitter {
    fn split(&self, script: &str, _transaction_enabled: bool) -> Vec<SqlStatement> {
        script
            .split(DELIMITER)
            .map(str::trim)
            .filter(|fragment| !fragment.is_empty())
            .map(|fragment| SqlStatement::new(fragment, false))
            .collect()
    }
}
