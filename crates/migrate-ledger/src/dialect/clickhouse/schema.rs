//! ClickHouse schema (database) manager.
//!
//! ClickHouse schemas are databases. The engine has no sequences, domains,
//! standalone enum types, routines or aggregate objects, so teardown
//! reduces to views and tables enumerated from `system.tables`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::connection::SqlConnection;
use crate::core::identifier::{escape_clickhouse_literal, qualify, quote_ident};
use crate::dialect::SchemaManager;
use crate::error::Result;

/// Schema manager for one named ClickHouse database.
pub struct ClickhouseSchema {
    name: String,
    connection: Arc<dyn SqlConnection>,
}

impl ClickhouseSchema {
    /// Bind a manager to a database name and connection.
    pub fn new(name: impl Into<String>, connection: Arc<dyn SqlConnection>) -> Self {
        Self {
            name: name.into(),
            connection,
        }
    }

    fn name_literal(&self) -> String {
        escape_clickhouse_literal(&self.name)
    }

    /// Views first (they reference tables), then everything else.
    async fn teardown(&self) -> Result<()> {
        self.drop_views().await?;
        self.drop_tables().await?;
        // No base types, routines, enums, domains, sequences or aggregate
        // objects exist in this engine; those steps are no-ops.
        Ok(())
    }

    async fn drop_views(&self) -> Result<()> {
        let sql = format!(
            "SELECT name FROM system.tables WHERE database = {} \
             AND engine IN ('View', 'MaterializedView')",
            self.name_literal()
        );

        for view in self.connection.query_strings(&sql).await? {
            debug!(database = %self.name, view = %view, "dropping view");
            self.connection
                .execute(&format!(
                    "DROP VIEW IF EXISTS {}",
                    qualify(&self.name, &view)?
                ))
                .await?;
        }

        Ok(())
    }

    async fn drop_tables(&self) -> Result<()> {
        let sql = format!(
            "SELECT name FROM system.tables WHERE database = {} \
             AND engine NOT IN ('View', 'MaterializedView')",
            self.name_literal()
        );

        for table in self.connection.query_strings(&sql).await? {
            debug!(database = %self.name, table = %table, "dropping table");
            self.connection
                .execute(&format!(
                    "DROP TABLE IF EXISTS {}",
                    qualify(&self.name, &table)?
                ))
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl SchemaManager for ClickhouseSchema {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM system.databases WHERE name = {}",
            self.name_literal()
        );
        Ok(self.connection.query_long(&sql).await? > 0)
    }

    /// Conservatively reports non-empty: the engine offers no cheap
    /// emptiness answer, and pretending to one would be silently wrong.
    async fn is_empty(&self) -> Result<bool> {
        Ok(false)
    }

    async fn create(&self) -> Result<()> {
        self.connection
            .execute(&format!("CREATE DATABASE {}", quote_ident(&self.name)?))
            .await
    }

    /// This dialect tolerates dropping an absent database.
    async fn drop_schema(&self) -> Result<()> {
        self.connection
            .execute(&format!(
                "DROP DATABASE IF EXISTS {}",
                quote_ident(&self.name)?
            ))
            .await
    }

    async fn erase(&self) -> Result<()> {
        self.teardown().await
    }

    async fn clean(&self) -> Result<()> {
        self.teardown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{Row, SqlValue};
    use crate::test_support::MockConnection;

    fn text_row(s: &str) -> Row {
        Row::new(vec![SqlValue::Text(s.to_string())])
    }

    fn schema(conn: &Arc<MockConnection>) -> ClickhouseSchema {
        ClickhouseSchema::new("analytics", Arc::clone(conn) as Arc<dyn SqlConnection>)
    }

    #[tokio::test]
    async fn test_exists() {
        let conn = Arc::new(MockConnection::new());
        conn.push_long(1);
        assert!(schema(&conn).exists().await.unwrap());
        assert!(conn.sql_log()[0].contains("system.databases"));
        assert!(conn.sql_log()[0].contains("'analytics'"));
    }

    #[tokio::test]
    async fn test_is_empty_fixed_answer() {
        let conn = Arc::new(MockConnection::new());
        assert!(!schema(&conn).is_empty().await.unwrap());
        // No catalog query is issued
        assert!(conn.sql_log().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_drop_sql() {
        let conn = Arc::new(MockConnection::new());
        let s = schema(&conn);
        s.create().await.unwrap();
        s.drop_schema().await.unwrap();

        assert_eq!(
            conn.executed(),
            vec![
                "CREATE DATABASE \"analytics\"".to_string(),
                "DROP DATABASE IF EXISTS \"analytics\"".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_erase_drops_views_then_tables() {
        let conn = Arc::new(MockConnection::new());
        conn.push_rows(vec![text_row("hourly_mv")]); // views
        conn.push_rows(vec![text_row("events"), text_row("sessions")]); // tables

        schema(&conn).erase().await.unwrap();

        assert_eq!(
            conn.executed(),
            vec![
                "DROP VIEW IF EXISTS \"analytics\".\"hourly_mv\"".to_string(),
                "DROP TABLE IF EXISTS \"analytics\".\"events\"".to_string(),
                "DROP TABLE IF EXISTS \"analytics\".\"sessions\"".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_erase_aborts_on_engine_error() {
        let conn = Arc::new(MockConnection::new());
        conn.push_rows(vec![text_row("hourly_mv")]); // views
        conn.fail_next_execute("table is readonly");

        let err = schema(&conn).erase().await.unwrap_err();
        assert!(err.to_string().contains("table is readonly"));

        // Table enumeration never ran
        assert_eq!(
            conn.sql_log()
                .iter()
                .filter(|s| s.contains("system.tables"))
                .count(),
            1
        );
    }
}
