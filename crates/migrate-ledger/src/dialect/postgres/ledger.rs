//! PostgreSQL migration ledger.
//!
//! The ledger table uses a `SERIAL` identity column, so record numbering is
//! assigned by the engine at insert time and stays race-free even without
//! the advisory lock held. `installed_on` defaults to the engine clock.

use std::sync::Arc;

use async_trait::async_trait;

use crate::connection::SqlConnection;
use crate::core::identifier::{escape_pg_literal, qualify};
use crate::dialect::postgres::{APPLICATION_LOCK_KEY, CURRENT_USER_SQL};
use crate::dialect::MigrationLedger;
use crate::error::Result;
use crate::record::{
    kind_to_i16, truncate_with_ellipsis, MigrationRecord, NewMigration, MAX_DESCRIPTION_LEN,
    MAX_NAME_LEN,
};

/// Migration ledger bound to one PostgreSQL schema and table.
pub struct PostgresLedger {
    schema: String,
    table: String,
    connection: Arc<dyn SqlConnection>,
}

impl PostgresLedger {
    /// Bind a ledger to a schema, table name and connection.
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
impl MigrationLedger for PostgresLedger {
    async fn try_lock(&self) -> Result<bool> {
        // Granted at application level, same key as the facade
        self.connection
            .query_bool(&format!(
                "SELECT pg_try_advisory_lock({APPLICATION_LOCK_KEY})"
            ))
            .await
    }

    async fn release_lock(&self) -> Result<bool> {
        self.connection
            .query_bool(&format!("SELECT pg_advisory_unlock({APPLICATION_LOCK_KEY})"))
            .await
    }

    async fn exists(&self) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM pg_tables WHERE schemaname = {} AND tablename = {}",
            escape_pg_literal(&self.schema),
            escape_pg_literal(&self.table)
        );
        Ok(self.connection.query_long(&sql).await? > 0)
    }

    async fn create(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE {} (\
               id SERIAL PRIMARY KEY NOT NULL, \
               type SMALLINT NOT NULL, \
               version VARCHAR(50), \
               description VARCHAR({MAX_DESCRIPTION_LEN}) NOT NULL, \
               name VARCHAR({MAX_NAME_LEN}) NOT NULL, \
               checksum VARCHAR(32) NOT NULL, \
               installed_by VARCHAR(100) NOT NULL, \
               installed_on TIMESTAMP NOT NULL DEFAULT now(), \
               success BOOLEAN NOT NULL\
             )",
            self.qualified()?
        );
        self.connection.execute(&sql).await
    }

    async fn save(&self, migration: &NewMigration) -> Result<()> {
        let version = match &migration.version {
            Some(v) => escape_pg_literal(v),
            None => "null".to_string(),
        };

        // id and installed_on are engine-assigned; installed_by resolves
        // server-side to the executing user
        let sql = format!(
            "INSERT INTO {} (type, version, description, name, checksum, installed_by, success) \
             VALUES ({}, {}, {}, {}, {}, {}, {})",
            self.qualified()?,
            kind_to_i16(migration.kind),
            version,
            escape_pg_literal(&truncate_with_ellipsis(
                &migration.description,
                MAX_DESCRIPTION_LEN
            )),
            escape_pg_literal(&truncate_with_ellipsis(&migration.name, MAX_NAME_LEN)),
            escape_pg_literal(&migration.checksum),
            CURRENT_USER_SQL,
            migration.success,
        );

        self.connection.execute(&sql).await
    }

    async fn update_checksum(&self, id: i32, checksum: &str) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET checksum = {} WHERE id = {}",
            self.qualified()?,
            escape_pg_literal(checksum),
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
