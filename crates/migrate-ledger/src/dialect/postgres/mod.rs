//! PostgreSQL dialect.
//!
//! The fully-featured engine: session advisory locks serialize migrator
//! runs, the ledger uses an identity column for race-free numbering, and
//! schema teardown walks the system catalogs in dependency order.

mod ledger;
mod schema;
mod splitter;

pub use ledger::PostgresLedger;
pub use schema::PostgresSchema;
pub use splitter::PostgresSplitter;

use std::sync::Arc;

use async_trait::async_trait;

use crate::connection::SqlConnection;
use crate::dialect::{
    sanitize_schema_name, DatabaseDialect, MigrationLedger, SchemaManager, StatementSplitter,
};
use crate::error::Result;

/// Advisory lock key shared by every migrator process targeting one
/// PostgreSQL database. All instances must contend on the same key for the
/// lock to serialize anything.
pub const APPLICATION_LOCK_KEY: i64 = 0x6d69_6772_6c6f_636b;

/// SQL expression resolving the executing user.
pub(crate) const CURRENT_USER_SQL: &str = "current_user";

/// PostgreSQL dialect facade.
pub struct PostgresDialect {
    connection: Arc<dyn SqlConnection>,
}

impl PostgresDialect {
    /// Create a facade over a live connection.
    pub fn new(connection: Arc<dyn SqlConnection>) -> Self {
        Self { connection }
    }
}

impl std::fmt::Debug for PostgresDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDialect").finish_non_exhaustive()
    }
}

#[async_trait]
impl DatabaseDialect for PostgresDialect {
    fn display_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn current_user_sql(&self) -> &'static str {
        CURRENT_USER_SQL
    }

    async fn current_schema_name(&self) -> Result<String> {
        // search_path may hold several entries; only the first real one
        // is wanted.
        let raw = self.connection.query_string("SHOW search_path").await?;
        Ok(sanitize_schema_name(&raw))
    }

    fn schema(&self, name: &str) -> Box<dyn SchemaManager> {
        Box::new(PostgresSchema::new(name, Arc::clone(&self.connection)))
    }

    fn migration_ledger(&self, schema: &str, table: &str) -> Box<dyn MigrationLedger> {
        Box::new(PostgresLedger::new(
            schema,
            table,
            Arc::clone(&self.connection),
        ))
    }

    fn splitter(&self) -> Box<dyn StatementSplitter> {
        Box::new(PostgresSplitter)
    }

    async fn try_acquire_application_lock(&self) -> Result<bool> {
        self.connection
            .query_bool(&format!(
                "SELECT pg_try_advisory_lock({APPLICATION_LOCK_KEY})"
            ))
            .await
    }

    async fn release_application_lock(&self) -> Result<bool> {
        self.connection
            .query_bool(&format!("SELECT pg_advisory_unlock({APPLICATION_LOCK_KEY})"))
            .await
    }
}
