//! Shared building blocks used by every dialect.
//!
//! - [`identifier`]: validation, quoting and literal escaping for dynamic SQL
//! - [`value`]: scalar values and typed row accessors for query results

pub mod identifier;
pub mod value;

pub use identifier::{
    escape_clickhouse_literal, escape_pg_literal, qualify, quote_ident, validate_identifier,
};
pub use value::{Row, SqlValue};
