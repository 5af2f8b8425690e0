//! Dialect contracts and engine-specific implementations.
//!
//! This module defines the abstractions every supported engine must satisfy:
//!
//! - [`DatabaseDialect`]: the facade composing everything for one engine
//! - [`SchemaManager`]: existence checks and destructive schema operations
//! - [`MigrationLedger`]: the persisted migration history table
//! - [`StatementSplitter`]: script-to-statement decomposition
//!
//! # Architecture
//!
//! Each engine module implements all four contracts:
//!
//! - [`postgres`]: fully-featured relational engine (advisory locks,
//!   transactional DDL, rich catalog teardown)
//! - [`clickhouse`]: reduced-capability columnar engine (no locking
//!   primitive, no multi-statement transactions)
//!
//! The external migration runner selects an engine with [`dialect_for`] and
//! never issues raw SQL itself for ledger or schema-reset purposes.
//!
//! # Adding New Engines
//!
//! 1. Create a new module under `dialect/` (e.g., `dialect/mysql/`)
//! 2. Implement the four traits against the engine's catalogs
//! 3. Register the facade in [`dialect_for`]

pub mod clickhouse;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::connection::SqlConnection;
use crate::error::{LedgerError, Result};
use crate::record::{MigrationRecord, NewMigration};

pub use clickhouse::ClickhouseDialect;
pub use postgres::PostgresDialect;

/// One executable statement produced by a [`StatementSplitter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    /// Statement text, trimmed, without the trailing delimiter.
    pub text: String,

    /// Whether the statement must be enlisted in the caller's transaction.
    pub run_in_transaction: bool,
}

impl SqlStatement {
    /// Create a statement.
    pub fn new(text: impl Into<String>, run_in_transaction: bool) -> Self {
        Self {
            text: text.into(),
            run_in_transaction,
        }
    }
}

/// Turn one raw script string into an ordered sequence of atomic statements.
///
/// Splitting is lexical best-effort: it never fails on malformed input, and
/// downstream execution errors surface at statement-execution time.
pub trait StatementSplitter: Send + Sync {
    /// Split a script into statements.
    ///
    /// Empty or whitespace-only input yields an empty sequence, not an
    /// error. `transaction_enabled` tells the splitter whether the caller
    /// intends to run the script inside a transaction; engines without
    /// multi-statement transactions ignore it.
    fn split(&self, script: &str, transaction_enabled: bool) -> Vec<SqlStatement>;
}

/// Existence checks and destructive operations over one named schema.
///
/// Destructive operations only ever touch objects owned by the schema,
/// never system or extension-owned objects. A failing step aborts the
/// remaining sequence and propagates; partial teardown is surfaced, not
/// hidden.
#[async_trait]
pub trait SchemaManager: Send + Sync {
    /// The schema name this manager is bound to.
    fn name(&self) -> &str;

    /// Whether the schema exists. Absence is `false`, not an error.
    async fn exists(&self) -> Result<bool>;

    /// Whether the schema contains zero user-created objects.
    ///
    /// Engines lacking the relevant catalog views may conservatively
    /// return a fixed answer; each implementation documents its behavior.
    async fn is_empty(&self) -> Result<bool>;

    /// Create the schema. Creating an existing schema fails with an
    /// engine error.
    async fn create(&self) -> Result<()>;

    /// Drop the schema and everything in it.
    async fn drop_schema(&self) -> Result<()>;

    /// Destroy every object inside the schema, leaving the schema itself
    /// intact, in dependency order.
    async fn erase(&self) -> Result<()>;

    /// Same teardown as [`erase`], used for iterative development resets.
    ///
    /// [`erase`]: SchemaManager::erase
    async fn clean(&self) -> Result<()>;
}

/// The persisted migration history table for one schema.
#[async_trait]
pub trait MigrationLedger: Send + Sync {
    /// Acquire the application lock. Delegates to the engine's lock
    /// primitive; the ledger holds no lock state itself.
    async fn try_lock(&self) -> Result<bool>;

    /// Release the application lock.
    async fn release_lock(&self) -> Result<bool>;

    /// Whether the ledger table exists in its schema.
    async fn exists(&self) -> Result<bool>;

    /// Create the ledger table. Fails if it already exists.
    async fn create(&self) -> Result<()>;

    /// Append one record. The ledger assigns the id, resolves the
    /// installing user and timestamps the row; `description` and `name`
    /// are truncated to their column limits first.
    async fn save(&self, migration: &NewMigration) -> Result<()>;

    /// In-place checksum repair of the record with the given id.
    ///
    /// Completes without error even if no row matches; rows-affected
    /// verification is not part of the contract.
    async fn update_checksum(&self, id: i32, checksum: &str) -> Result<()>;

    /// Every record, ordered by id ascending, fully materialized.
    async fn all_records(&self) -> Result<Vec<MigrationRecord>>;
}

/// The composition root for one engine: produces schema managers, ledgers
/// and splitters bound to a shared connection, and owns the application
/// lock operations.
#[async_trait]
pub trait DatabaseDialect: Send + Sync + std::fmt::Debug {
    /// Human-readable engine name.
    fn display_name(&self) -> &'static str;

    /// SQL expression resolving the current user on this engine, embedded
    /// unquoted into ledger inserts.
    fn current_user_sql(&self) -> &'static str;

    /// Resolve and sanitize the connection's current schema name.
    async fn current_schema_name(&self) -> Result<String>;

    /// Schema manager for a named schema.
    fn schema(&self, name: &str) -> Box<dyn SchemaManager>;

    /// Migration ledger bound to a schema and table name.
    fn migration_ledger(&self, schema: &str, table: &str) -> Box<dyn MigrationLedger>;

    /// Statement splitter for this engine's scripts.
    fn splitter(&self) -> Box<dyn StatementSplitter>;

    /// Try to acquire the engine-scoped application lock.
    ///
    /// Returns `false` when another migrator holds it. Engines without a
    /// native primitive return `true` unconditionally - a documented
    /// degradation, not an omission.
    async fn try_acquire_application_lock(&self) -> Result<bool>;

    /// Release the application lock.
    async fn release_application_lock(&self) -> Result<bool>;
}

/// Create the dialect facade for a database type string.
///
/// # Errors
///
/// Returns [`LedgerError::UnknownDialect`] if the database type is not
/// recognized.
pub fn dialect_for(
    db_type: &str,
    connection: Arc<dyn SqlConnection>,
) -> Result<Box<dyn DatabaseDialect>> {
    match db_type.to_lowercase().as_str() {
        "postgres" | "postgresql" | "pg" => Ok(Box::new(PostgresDialect::new(connection))),
        "clickhouse" | "ch" => Ok(Box::new(ClickhouseDialect::new(connection))),
        other => Err(LedgerError::UnknownDialect(other.to_string())),
    }
}

/// Sanitize a raw current-schema answer into a single schema name.
///
/// Some engines return a search path rather than a single name: quote
/// characters and the `$user` placeholder are stripped, a leading comma is
/// dropped, and the result is cut at the first remaining comma so only the
/// first real entry survives.
pub(crate) fn sanitize_schema_name(raw: &str) -> String {
    let cleaned = raw.replace('"', "").replace("$user", "");
    let mut name = cleaned.trim().to_string();

    if let Some(stripped) = name.strip_prefix(',') {
        name = stripped.to_string();
    }

    if let Some(pos) = name.find(',') {
        name.truncate(pos);
    }

    name.trim().to_string()
}
