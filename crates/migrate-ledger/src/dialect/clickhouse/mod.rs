//! ClickHouse dialect.
//!
//! The reduced-capability columnar engine: no locking primitive, no
//! multi-statement transactions, append-only storage. The application lock
//! degrades to an unconditional grant (logged once), so concurrent
//! migrators against the same database can race on ledger numbering.

mod ledger;
mod schema;
mod splitter;

pub use ledger::ClickhouseLedger;
pub use schema::ClickhouseSchema;
pub use splitter::ClickhouseSplitter;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::connection::SqlConnection;
use crate::dialect::{
    sanitize_schema_name, DatabaseDialect, MigrationLedger, SchemaManager, StatementSplitter,
};
use crate::error::Result;

/// SQL expression resolving the executing user.
pub(crate) const CURRENT_USER_SQL: &str = "currentUser()";

/// ClickHouse dialect facade.
pub struct ClickhouseDialect {
    connection: Arc<dyn SqlConnection>,
    lock_warned: AtomicBool,
}

impl std::fmt::Debug for ClickhouseDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickhouseDialect")
            .field("lock_warned", &self.lock_warned)
            .finish_non_exhaustive()
    }
}

impl ClickhouseDialect {
    /// Create a facade over a live connection.
    pub fn new(connection: Arc<dyn SqlConnection>) -> Self {
        Self {
            connection,
            lock_warned: AtomicBool::new(false),
        }
    }

    fn warn_lock_degraded(&self) {
        if !self.lock_warned.swap(true, Ordering::SeqCst) {
            warn!(
                "ClickHouse has no session lock primitive: the application lock \
                 is a no-op and concurrent migrators are not serialized"
            );
        }
    }
}

#[async_trait]
impl DatabaseDialect for ClickhouseDialect {
    fn display_name(&self) -> &'static str {
        "ClickHouse"
    }

    fn current_user_sql(&self) -> &'static str {
        CURRENT_USER_SQL
    }

    async fn current_schema_name(&self) -> Result<String> {
        let raw = self
            .connection
            .query_string("SELECT currentDatabase()")
            .await?;
        Ok(sanitize_schema_name(&raw))
    }

    fn schema(&self, name: &str) -> Box<dyn SchemaManager> {
        Box::new(ClickhouseSchema::new(name, Arc::clone(&self.connection)))
    }

    fn migration_ledger(&self, schema: &str, table: &str) -> Box<dyn MigrationLedger> {
        Box::new(ClickhouseLedger::new(
            schema,
            table,
            Arc::clone(&self.connection),
        ))
    }

    fn splitter(&self) -> Box<dyn StatementSplitter> {
        Box::new(ClickhouseSplitter)
    }

    /// Always granted: there is no engine primitive to delegate to.
    async fn try_acquire_application_lock(&self) -> Result<bool> {
        self.warn_lock_degraded();
        Ok(true)
    }

    /// Always succeeds, mirroring the acquire side.
    async fn release_application_lock(&self) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockConnection;

    fn dialect(conn: &Arc<MockConnection>) -> ClickhouseDialect {
        ClickhouseDialect::new(Arc::clone(conn) as Arc<dyn SqlConnection>)
    }

    #[tokio::test]
    async fn test_lock_is_documented_noop() {
        let conn = Arc::new(MockConnection::new());
        let dialect = dialect(&conn);

        // Unconditional grant regardless of prior acquisition state
        assert!(dialect.try_acquire_application_lock().await.unwrap());
        assert!(dialect.try_acquire_application_lock().await.unwrap());
        assert!(dialect.release_application_lock().await.unwrap());
        assert!(dialect.release_application_lock().await.unwrap());

        // No SQL reaches the engine
        assert!(conn.sql_log().is_empty());
    }

    #[tokio::test]
    async fn test_current_schema_name() {
        let conn = Arc::new(MockConnection::new());
        conn.push_string("analytics");

        let name = dialect(&conn).current_schema_name().await.unwrap();
        assert_eq!(name, "analytics");
        assert_eq!(conn.sql_log(), vec!["SELECT currentDatabase()"]);
    }

    #[test]
    fn test_identity() {
        let conn = Arc::new(MockConnection::new());
        let dialect = dialect(&conn);
        assert_eq!(dialect.display_name(), "ClickHouse");
        assert_eq!(dialect.current_user_sql(), "currentUser()");
    }
}
