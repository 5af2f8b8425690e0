//! Centralized identifier validation, quoting and literal escaping.
//!
//! The connection capability is SQL-text only: identifiers and values cannot
//! be bound as parameters, so every dynamic fragment must pass through these
//! helpers before it reaches a query string. Ad-hoc interpolation elsewhere
//! in the crate is a defect.
//!
//! # Security
//!
//! SQL identifiers (schema names, table names) cannot be parameterized in
//! prepared statements either - that is a limitation of SQL itself. To safely
//! build dynamic DDL we:
//!
//! 1. Validate identifiers for suspicious patterns (null bytes, excessive length)
//! 2. Apply double-quote quoting with embedded-quote doubling
//!
//! Both supported engines (PostgreSQL, ClickHouse) accept `"..."` quoting.
//! String literal escaping differs per engine and has a dedicated helper each.

use crate::error::{LedgerError, Result};

/// Maximum identifier length (conservative limit across engines).
/// - PostgreSQL: 63 bytes
/// - ClickHouse: no hard limit, but catalogs misbehave on huge names
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
/// - Identifiers exceeding maximum length
///
/// # Errors
///
/// Returns [`LedgerError::Identifier`] with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LedgerError::Identifier(
            "identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(LedgerError::Identifier(format!(
            "identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(LedgerError::Identifier(format!(
            "identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote an identifier with double quotes.
///
/// Escapes embedded double quotes by doubling them and validates the
/// identifier before quoting.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(quote_ident("users")?, "\"users\"");
/// assert_eq!(quote_ident("table\"name")?, "\"table\"\"name\"");
/// ```
pub fn quote_ident(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Qualify an object name with its schema, both quoted.
///
/// Returns `"schema"."object"`.
pub fn qualify(schema: &str, object: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_ident(schema)?, quote_ident(object)?))
}

/// Escape a PostgreSQL string literal.
///
/// Doubles embedded single quotes and wraps in single quotes. With
/// `standard_conforming_strings` (the default since 9.1) backslashes are
/// ordinary characters and must not be doubled.
pub fn escape_pg_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Escape a ClickHouse string literal.
///
/// ClickHouse treats backslash as an escape character inside literals, so
/// both backslashes and single quotes need escaping.
pub fn escape_clickhouse_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
