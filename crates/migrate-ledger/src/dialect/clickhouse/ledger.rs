//! ClickHouse migration ledger.
//!
//! MergeTree storage has no identity columns, so record ids come from a
//! max-id read followed by an insert. That pair is only safe while migrator
//! runs are serialized externally; this engine's application lock is a
//! no-op, which is a documented limitation of the dialect.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::connection::SqlConnection;
use crate::core::identifier::{escape_clickhouse_literal, qualify};
use crate::dialect::clickhouse::CURRENT_USER_SQL;
use crate::dialect::MigrationLedger;
use crate::error::Result;
use crate::record::{
    kind_to_i16, truncate_with_ellipsis, MigrationRecord, NewMigration, MAX_DESCRIPTION_LEN,
    MAX_NAME_LEN,
};

/// Migration ledger bound to one ClickHouse database and table.
pub struct ClickhouseLedger {
    schema: String,
    table: String,
    connection: Arc<dyn SqlConnection>,
}

impl ClickhouseLedger {
    /// Bind a ledger to a database, table name and connection.
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        connection: Arc<dyn SqlConnection>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            connection,
        }
    }

    fn qualified(&self) -> Result<String> {
        qualify(&self.schema, &self.table)
    }
}

#[async_trait]
impl MigrationLedger for ClickhouseLedger {
    /// Always granted: the lock degrades to a no-op on this engine.
    async fn try_lock(&self) -> Result<bool> {
        Ok(true)
    }

    async fn release_lock(&self) -> Result<bool> {
        Ok(true)
    }

    async fn exists(&self) -> Result<bool> {
        let sql = format!(
            "SELECT count() FROM system.tables WHERE database = {} AND name = {}",
            escape_clickhouse_literal(&self.schema),
            escape_clickhouse_literal(&self.table)
        );
        Ok(self.connection.query_long(&sql).await? == 1)
    }

    async fn create(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE {} (\
               id Int32, \
               type Int16, \
               version Nullable(String), \
               description String, \
               name String, \
               checksum String, \
               installed_by String, \
               installed_on DateTime, \
               success Int8\
             ) ENGINE = MergeTree \
             PARTITION BY toYYYYMM(installed_on) \
             PRIMARY KEY (id) \
             ORDER BY (id, installed_on) \
             SETTINGS index_granularity = 8192",
            self.qualified()?
        );
        self.connection.execute(&sql).await
    }

    async fn save(&self, migration: &NewMigration) -> Result<()> {
        // max() over an empty Int32 column is 0, so the first record gets 1.
        // Racy without external serialization; see the module docs.
        let next_id = self
            .connection
            .query_long(&format!("SELECT max(id) FROM {}", self.qualified()?))
            .await?
            + 1;

        let version = match &migration.version {
            Some(v) => escape_clickhouse_literal(v),
            None => "null".to_string(),
        };
        let installed_on = Utc::now().format("%Y-%m-%d %H:%M:%S");

        let sql = format!(
            "INSERT INTO {} \
             (id, type, version, description, name, checksum, installed_by, installed_on, success) \
             VALUES ({}, {}, {}, {}, {}, {}, {}, '{}', {})",
            self.qualified()?,
            next_id,
            kind_to_i16(migration.kind),
            version,
            escape_clickhouse_literal(&truncate_with_ellipsis(
                &migration.description,
                MAX_DESCRIPTION_LEN
            )),
            escape_clickhouse_literal(&truncate_with_ellipsis(&migration.name, MAX_NAME_LEN)),
            escape_clickhouse_literal(&migration.checksum),
            CURRENT_USER_SQL,
            installed_on,
            i8::from(migration.success),
        );

        self.connection.execute(&sql).await
    }

    async fn update_checksum(&self, id: i32, checksum: &str) -> Result<()> {
        // In-place updates are mutations on this engine
        let sql = format!(
            "ALTER TABLE {} UPDATE checksum = {} WHERE id = {}",
            self.qualified()?,
            escape_clickhouse_literal(checksum),
            id
        );
        self.connection.execute(&sql).await
    }

    async fn all_records(&self) -> Result<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT id, type, version, description, name, checksum, \
             installed_by, installed_on, success FROM {} ORDER BY id",
            self.qualified()?
        );

        self.connection
            .query_rows(&sql)
            .await?
            .iter()
            .map(MigrationRecord::from_row)
            .collect()
    }
}
