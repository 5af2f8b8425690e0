//! Error types for the migration ledger library.

use thiserror::Error;

/// Main error type for ledger, schema and dialect operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Engine or connectivity error raised by the connection layer.
    ///
    /// These are never retried here; retry policy belongs to the caller.
    #[error("Database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Identifier failed validation (empty, null byte, excessive length).
    #[error("Invalid identifier: {0}")]
    Identifier(String),

    /// A ledger row column did not decode to the expected type.
    #[error("Row decode error: column {column} is not {expected}")]
    RowDecode {
        column: usize,
        expected: &'static str,
    },

    /// Unknown migration kind discriminant read from the ledger table.
    #[error("Unknown migration kind: {0}")]
    UnknownKind(i16),

    /// Unknown database type requested from the dialect factory.
    #[error("Unknown database type: '{0}'. Supported types: postgres, clickhouse")]
    UnknownDialect(String),
}

impl LedgerError {
    /// Wrap an engine error produced by a connection implementation.
    pub fn database<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        LedgerError::Database(Box::new(err))
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
