//! PostgreSQL schema manager.
//!
//! Destructive teardown walks the system catalogs and drops objects in
//! dependency order: views depend on tables, tables on types, domains and
//! sequences, so dropping out of order raises dependency-violation errors
//! from the engine. Objects owned by an installed extension are excluded
//! from every enumeration (`pg_depend` with `deptype = 'e'`).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::connection::SqlConnection;
use crate::core::identifier::{escape_pg_literal, qualify, quote_ident};
use crate::dialect::SchemaManager;
use crate::error::Result;

/// Schema manager for one named PostgreSQL schema.
pub struct PostgresSchema {
    name: String,
    connection: Arc<dyn SqlConnection>,
}

impl PostgresSchema {
    /// Bind a manager to a schema name and connection.
    pub fn new(name: impl Into<String>, connection: Arc<dyn SqlConnection>) -> Self {
        Self {
            name: name.into(),
            connection,
        }
    }

    fn name_literal(&self) -> String {
        escape_pg_literal(&self.name)
    }

    /// The full teardown sequence shared by `erase` and `clean`.
    async fn teardown(&self) -> Result<()> {
        self.drop_materialized_views().await?;
        self.drop_views().await?;
        self.drop_tables().await?;
        self.drop_base_types(true).await?;
        self.drop_routines().await?;
        self.drop_enums().await?;
        self.drop_domains().await?;
        self.drop_sequences().await?;
        self.drop_aggregates().await?;
        self.drop_base_types(false).await?;
        Ok(())
    }

    async fn drop_materialized_views(&self) -> Result<()> {
        // Materialized views arrived in 9.3
        let version = self.connection.query_string("SHOW server_version").await?;
        if !supports_materialized_views(&version) {
            return Ok(());
        }

        let sql = format!(
            "SELECT relname FROM pg_catalog.pg_class c \
             JOIN pg_namespace n ON n.oid = c.relnamespace \
             WHERE c.relkind = 'm' AND n.nspname = {}",
            self.name_literal()
        );

        for view in self.connection.query_strings(&sql).await? {
            debug!(schema = %self.name, view = %view, "dropping materialized view");
            self.connection
                .execute(&format!(
                    "DROP MATERIALIZED VIEW IF EXISTS {} CASCADE",
                    qualify(&self.name, &view)?
                ))
                .await?;
        }

        Ok(())
    }

    async fn drop_views(&self) -> Result<()> {
        let sql = format!(
            "SELECT relname FROM pg_catalog.pg_class c \
             JOIN pg_namespace n ON n.oid = c.relnamespace \
             LEFT JOIN pg_depend dep ON dep.objid = c.oid AND dep.deptype = 'e' \
             WHERE c.relkind = 'v' AND n.nspname = {} AND dep.objid IS NULL",
            self.name_literal()
        );

        for view in self.connection.query_strings(&sql).await? {
            debug!(schema = %self.name, view = %view, "dropping view");
            self.connection
                .execute(&format!(
                    "DROP VIEW IF EXISTS {} CASCADE",
                    qualify(&self.name, &view)?
                ))
                .await?;
        }

        Ok(())
    }

    async fn drop_tables(&self) -> Result<()> {
        // Inherited children go away with their parent's CASCADE
        let sql = format!(
            "SELECT t.table_name FROM information_schema.tables t \
             LEFT JOIN pg_depend dep ON dep.objid = \
               (quote_ident(t.table_schema)||'.'||quote_ident(t.table_name))::regclass::oid \
               AND dep.deptype = 'e' \
             WHERE table_schema = {} \
             AND table_type = 'BASE TABLE' \
             AND dep.objid IS NULL \
             AND NOT (SELECT EXISTS (SELECT inhrelid FROM pg_catalog.pg_inherits \
               WHERE inhrelid = \
               (quote_ident(t.table_schema)||'.'||quote_ident(t.table_name))::regclass::oid))",
            self.name_literal()
        );

        for table in self.connection.query_strings(&sql).await? {
            debug!(schema = %self.name, table = %table, "dropping table");
            self.connection
                .execute(&format!(
                    "DROP TABLE IF EXISTS {} CASCADE",
                    qualify(&self.name, &table)?
                ))
                .await?;
        }

        Ok(())
    }

    async fn drop_base_types(&self, recreate: bool) -> Result<()> {
        // Non-array, non-composite types owned by the schema
        let sql = format!(
            "SELECT typname, typcategory FROM pg_catalog.pg_type t \
             WHERE (t.typrelid = 0 OR \
               (SELECT c.relkind = 'c' FROM pg_catalog.pg_class c WHERE c.oid = t.typrelid)) \
             AND NOT EXISTS(SELECT 1 FROM pg_catalog.pg_type el \
               WHERE el.oid = t.typelem AND el.typarray = t.oid) \
             AND t.typnamespace IN \
               (SELECT oid FROM pg_catalog.pg_namespace WHERE nspname = {})",
            self.name_literal()
        );

        let mut types = Vec::new();
        for row in self.connection.query_rows(&sql).await? {
            types.push((row.get_string(0)?, row.get_string(1)?));
        }

        for (type_name, _) in &types {
            debug!(schema = %self.name, type_name = %type_name, "dropping type");
            self.connection
                .execute(&format!(
                    "DROP TYPE IF EXISTS {} CASCADE",
                    qualify(&self.name, type_name)?
                ))
                .await?;
        }

        if recreate {
            // Only pseudo-types (P) and user-defined shell types (U) can be
            // recreated without their original definition
            for (type_name, category) in &types {
                if category == "P" || category == "U" {
                    self.connection
                        .execute(&format!("CREATE TYPE {}", qualify(&self.name, type_name)?))
                        .await?;
                }
            }
        }

        Ok(())
    }

    async fn drop_routines(&self) -> Result<()> {
        let sql = format!(
            "SELECT p.proname, oidvectortypes(p.proargtypes) AS args \
             FROM pg_proc p INNER JOIN pg_namespace ns ON p.pronamespace = ns.oid \
             LEFT JOIN pg_depend dep ON dep.objid = p.oid AND dep.deptype = 'e' \
             WHERE p.prokind IN ('f', 'p') AND ns.nspname = {} AND dep.objid IS NULL",
            self.name_literal()
        );

        for row in self.connection.query_rows(&sql).await? {
            let name = row.get_string(0)?;
            let args = row.get_string(1)?;
            debug!(schema = %self.name, routine = %name, "dropping routine");
            self.connection
                .execute(&format!(
                    "DROP ROUTINE IF EXISTS {}.{}({}) CASCADE",
                    quote_ident(&self.name)?,
                    quote_ident(&name)?,
                    args
                ))
                .await?;
        }

        Ok(())
    }

    async fn drop_enums(&self) -> Result<()> {
        let sql = format!(
            "SELECT t.typname FROM pg_catalog.pg_type t \
             INNER JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace \
             WHERE n.nspname = {} AND t.typtype = 'e'",
            self.name_literal()
        );

        for enum_name in self.connection.query_strings(&sql).await? {
            debug!(schema = %self.name, enum_name = %enum_name, "dropping enum type");
            self.connection
                .execute(&format!("DROP TYPE {}", qualify(&self.name, &enum_name)?))
                .await?;
        }

        Ok(())
    }

    async fn drop_domains(&self) -> Result<()> {
        let sql = format!(
            "SELECT t.typname FROM pg_catalog.pg_type t \
             LEFT JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace \
             LEFT JOIN pg_depend dep ON dep.objid = t.oid AND dep.deptype = 'e' \
             WHERE t.typtype = 'd' AND n.nspname = {} AND dep.objid IS NULL",
            self.name_literal()
        );

        for domain in self.connection.query_strings(&sql).await? {
            debug!(schema = %self.name, domain = %domain, "dropping domain");
            self.connection
                .execute(&format!("DROP DOMAIN {}", qualify(&self.name, &domain)?))
                .await?;
        }

        Ok(())
    }

    async fn drop_sequences(&self) -> Result<()> {
        let sql = format!(
            "SELECT sequence_name FROM information_schema.sequences \
             WHERE sequence_schema = {}",
            self.name_literal()
        );

        for seq in self.connection.query_strings(&sql).await? {
            debug!(schema = %self.name, sequence = %seq, "dropping sequence");
            self.connection
                .execute(&format!(
                    "DROP SEQUENCE IF EXISTS {}",
                    qualify(&self.name, &seq)?
                ))
                .await?;
        }

        Ok(())
    }

    async fn drop_aggregates(&self) -> Result<()> {
        let sql = format!(
            "SELECT p.proname, oidvectortypes(p.proargtypes) AS args \
             FROM pg_proc p INNER JOIN pg_namespace ns ON p.pronamespace = ns.oid \
             WHERE p.prokind = 'a' AND ns.nspname = {}",
            self.name_literal()
        );

        for row in self.connection.query_rows(&sql).await? {
            let name = row.get_string(0)?;
            let args = row.get_string(1)?;
            debug!(schema = %self.name, aggregate = %name, "dropping aggregate");
            self.connection
                .execute(&format!(
                    "DROP AGGREGATE IF EXISTS {}.{}({}) CASCADE",
                    quote_ident(&self.name)?,
                    quote_ident(&name)?,
                    args
                ))
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl SchemaManager for PostgresSchema {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM pg_namespace WHERE nspname = {}",
            self.name_literal()
        );
        Ok(self.connection.query_long(&sql).await? > 0)
    }

    async fn is_empty(&self) -> Result<bool> {
        // Relations, types and routines owned by the schema, excluding
        // anything belonging to an installed extension
        let name = self.name_literal();
        let sql = format!(
            "SELECT EXISTS (\
               SELECT c.oid FROM pg_catalog.pg_class c \
               JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
               LEFT JOIN pg_catalog.pg_depend d ON d.objid = c.oid AND d.deptype = 'e' \
               WHERE n.nspname = {name} AND d.objid IS NULL \
                 AND c.relkind IN ('r', 'v', 'S', 't') \
             UNION ALL \
               SELECT t.oid FROM pg_catalog.pg_type t \
               JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace \
               LEFT JOIN pg_catalog.pg_depend d ON d.objid = t.oid AND d.deptype = 'e' \
               WHERE n.nspname = {name} AND d.objid IS NULL \
                 AND t.typcategory NOT IN ('A', 'C') \
             UNION ALL \
               SELECT p.oid FROM pg_catalog.pg_proc p \
               JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace \
               LEFT JOIN pg_catalog.pg_depend d ON d.objid = p.oid AND d.deptype = 'e' \
               WHERE n.nspname = {name} AND d.objid IS NULL\
             )"
        );

        Ok(!self.connection.query_bool(&sql).await?)
    }

    async fn create(&self) -> Result<()> {
        self.connection
            .execute(&format!("CREATE SCHEMA {}", quote_ident(&self.name)?))
            .await
    }

    async fn drop_schema(&self) -> Result<()> {
        self.connection
            .execute(&format!("DROP SCHEMA {} CASCADE", quote_ident(&self.name)?))
            .await
    }

    async fn erase(&self) -> Result<()> {
        self.teardown().await
    }

    async fn clean(&self) -> Result<()> {
        self.teardown().await
    }
}

/// Whether the server version string is at least 9.3.
fn supports_materialized_views(version: &str) -> bool {
    let mut parts = version
        .split_whitespace()
        .next()
        .unwrap_or("")
        .split('.')
        .map(|p| p.parse::<u32>().unwrap_or(0));

    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);

    major > 9 || (major == 9 && minor >= 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{Row, SqlValue};
    use crate::test_support::MockConnection;

    fn text_row(s: &str) -> Row {
        Row::new(vec![SqlValue::Text(s.to_string())])
    }

    fn schema(conn: &Arc<MockConnection>) -> PostgresSchema {
        PostgresSchema::new("app", Arc::clone(conn) as Arc<dyn SqlConnection>)
    }

    #[test]
    fn test_supports_materialized_views() {
        assert!(supports_materialized_views("9.3"));
        assert!(supports_materialized_views("9.6.24"));
        assert!(supports_materialized_views("15.2"));
        assert!(supports_materialized_views("16.1 (Debian 16.1-1)"));
        assert!(!supports_materialized_views("9.2.4"));
        assert!(!supports_materialized_views("8.4"));
    }

    #[tokio::test]
    async fn test_exists() {
        let conn = Arc::new(MockConnection::new());
        conn.push_long(1);
        assert!(schema(&conn).exists().await.unwrap());

        conn.push_long(0);
        assert!(!schema(&conn).exists().await.unwrap());

        assert!(conn.sql_log()[0].contains("pg_namespace"));
        assert!(conn.sql_log()[0].contains("'app'"));
    }

    #[tokio::test]
    async fn test_is_empty_inverts_exists_answer() {
        let conn = Arc::new(MockConnection::new());
        conn.push_bool(false);
        assert!(schema(&conn).is_empty().await.unwrap());

        conn.push_bool(true);
        assert!(!schema(&conn).is_empty().await.unwrap());
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
                "CREATE SCHEMA \"app\"".to_string(),
                "DROP SCHEMA \"app\" CASCADE".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_erase_on_empty_schema_drops_nothing() {
        let conn = Arc::new(MockConnection::new());
        conn.push_string("15.2");

        schema(&conn).erase().await.unwrap();

        assert!(conn.executed().is_empty());
        let log = conn.sql_log();
        assert_eq!(log[0], "SHOW server_version");
        // Enumeration order: materialized views, views, tables, types
        let matview_pos = log.iter().position(|s| s.contains("relkind = 'm'")).unwrap();
        let view_pos = log.iter().position(|s| s.contains("relkind = 'v'")).unwrap();
        let table_pos = log.iter().position(|s| s.contains("BASE TABLE")).unwrap();
        let type_pos = log.iter().position(|s| s.contains("typcategory")).unwrap();
        assert!(matview_pos < view_pos && view_pos < table_pos && table_pos < type_pos);
    }

    #[tokio::test]
    async fn test_erase_drops_views_before_tables() {
        let conn = Arc::new(MockConnection::new());
        conn.push_string("15.2");
        conn.push_rows(vec![]); // materialized views
        conn.push_rows(vec![text_row("v_active")]); // views
        conn.push_rows(vec![text_row("users")]); // tables

        schema(&conn).erase().await.unwrap();

        assert_eq!(
            conn.executed(),
            vec![
                "DROP VIEW IF EXISTS \"app\".\"v_active\" CASCADE".to_string(),
                "DROP TABLE IF EXISTS \"app\".\"users\" CASCADE".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_erase_skips_materialized_views_before_9_3() {
        let conn = Arc::new(MockConnection::new());
        conn.push_string("9.2.4");

        schema(&conn).erase().await.unwrap();

        assert!(!conn.sql_log().iter().any(|s| s.contains("relkind = 'm'")));
    }

    #[tokio::test]
    async fn test_erase_recreates_user_defined_type_stubs() {
        let conn = Arc::new(MockConnection::new());
        conn.push_string("15.2");
        conn.push_rows(vec![]); // materialized views
        conn.push_rows(vec![]); // views
        conn.push_rows(vec![]); // tables
        conn.push_rows(vec![
            Row::new(vec![
                SqlValue::Text("mood".to_string()),
                SqlValue::Text("U".to_string()),
            ]),
            Row::new(vec![
                SqlValue::Text("box2d".to_string()),
                SqlValue::Text("G".to_string()),
            ]),
        ]); // base types, first pass

        schema(&conn).erase().await.unwrap();

        let executed = conn.executed();
        assert_eq!(
            executed,
            vec![
                "DROP TYPE IF EXISTS \"app\".\"mood\" CASCADE".to_string(),
                "DROP TYPE IF EXISTS \"app\".\"box2d\" CASCADE".to_string(),
                // Only category U is recreated as a shell type
                "CREATE TYPE \"app\".\"mood\"".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_erase_aborts_on_first_engine_error() {
        let conn = Arc::new(MockConnection::new());
        conn.push_string("15.2");
        conn.push_rows(vec![]); // materialized views
        conn.push_rows(vec![text_row("v_one"), text_row("v_two")]); // views
        conn.fail_next_execute("view is locked");

        let err = schema(&conn).erase().await.unwrap_err();
        assert!(err.to_string().contains("view is locked"));

        // Only the failing drop was attempted; the table step never ran
        assert_eq!(conn.executed().len(), 1);
        assert!(!conn.sql_log().iter().any(|s| s.contains("BASE TABLE")));
    }

    #[tokio::test]
    async fn test_clean_runs_same_teardown() {
        let conn = Arc::new(MockConnection::new());
        conn.push_string("15.2");
        conn.push_rows(vec![]); // materialized views
        conn.push_rows(vec![text_row("v_active")]); // views

        schema(&conn).clean().await.unwrap();

        assert_eq!(
            conn.executed(),
            vec!["DROP VIEW IF EXISTS \"app\".\"v_active\" CASCADE".to_string()]
        );
    }
}
