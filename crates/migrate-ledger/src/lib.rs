//! # migrate-ledger
//!
//! Dialect-pluggable migration ledger and schema management layer.
//!
//! This library provides the engine-facing core of a database migration
//! tool:
//!
//! - **Migration ledger**: one table per schema recording what was applied,
//!   in what order, with what checksum and outcome
//! - **Application lock**: serializes concurrent migrator runs where the
//!   engine has a primitive for it
//! - **Schema management**: existence checks and destructive resets in
//!   dependency order
//! - **Statement splitting**: turns one raw script into the statements the
//!   engine executes one at a time
//!
//! The top-level runner (file discovery, ordering, checksums, retry policy)
//! and the physical connectivity layer are external collaborators: the
//! runner implements [`SqlConnection`] over its driver of choice and talks
//! to one engine through a [`DatabaseDialect`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use migrate_ledger::{dialect_for, SqlConnection};
//!
//! async fn migrate(connection: Arc<dyn SqlConnection>) -> migrate_ledger::Result<()> {
//!     let dialect = dialect_for("postgres", connection)?;
//!     let schema = dialect.current_schema_name().await?;
//!     let ledger = dialect.migration_ledger(&schema, "changelog");
//!
//!     if dialect.try_acquire_application_lock().await? {
//!         if !ledger.exists().await? {
//!             ledger.create().await?;
//!         }
//!         let history = ledger.all_records().await?;
//!         // ... decide pending work, run scripts, append records ...
//!         dialect.release_application_lock().await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod core;
pub mod dialect;
pub mod error;
pub mod record;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenient access
pub use crate::connection::SqlConnection;
pub use crate::core::value::{Row, SqlValue};
pub use crate::dialect::{
    dialect_for, ClickhouseDialect, DatabaseDialect, MigrationLedger, PostgresDialect,
    SchemaManager, SqlStatement, StatementSplitter,
};
pub use crate::error::{LedgerError, Result};
pub use crate::record::{
    MigrationKind, MigrationRecord, NewMigration, MAX_DESCRIPTION_LEN, MAX_NAME_LEN,
};
