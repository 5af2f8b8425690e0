//! Connection capability consumed from the external connectivity layer.
//!
//! This crate never opens sockets itself. The migration runner owns the
//! physical connection (pooling, authentication, retries) and lends it to the
//! dialects through [`SqlConnection`]. Implementations wrap one live engine
//! connection and translate driver errors into [`LedgerError::Database`].
//!
//! [`LedgerError::Database`]: crate::error::LedgerError::Database

use async_trait::async_trait;

use crate::core::value::Row;
use crate::error::Result;

/// One physical engine connection, reduced to the operations the ledger and
/// schema managers need.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; dialects hold the connection behind
/// an `Arc` and may be used across await points.
#[async_trait]
pub trait SqlConnection: Send + Sync {
    /// Run a query returning a single string scalar.
    async fn query_string(&self, sql: &str) -> Result<String>;

    /// Run a query returning a single 64-bit integer scalar.
    async fn query_long(&self, sql: &str) -> Result<i64>;

    /// Run a query returning a single boolean scalar.
    async fn query_bool(&self, sql: &str) -> Result<bool>;

    /// Run a query returning zero or more rows of scalar values.
    async fn query_rows(&self, sql: &str) -> Result<Vec<Row>>;

    /// Execute a non-query statement. Raises on any engine error.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// First column of every result row, as text.
    ///
    /// Provided for catalog enumeration during schema teardown.
    async fn query_strings(&self, sql: &str) -> Result<Vec<String>> {
        let rows = self.query_rows(sql).await?;
        rows.iter().map(|row| row.get_string(0)).collect()
    }
}
