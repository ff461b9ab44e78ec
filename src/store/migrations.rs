//! Version-tracked database migrations for the ledger.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.
//! On first run against a database left by an earlier notifier deployment
//! (a `sent` table, no `_migrations` table), the old rows are imported once.

use libsql::Connection;

use crate::error::DatabaseError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "notified_ledger",
    sql: r#"
        CREATE TABLE IF NOT EXISTS notified (
            identity TEXT PRIMARY KEY,
            recorded_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_notified_recorded_at ON notified(recorded_at);
    "#,
}];

/// Run all pending migrations against the given connection.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = schema_version(conn).await?;
    let import_legacy = current_version == 0 && legacy_table_exists(conn).await?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                DatabaseError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            mark_applied(conn, migration.version, migration.name).await?;
        }
    }

    if import_legacy {
        let imported = conn
            .execute(
                "INSERT OR IGNORE INTO notified (identity, recorded_at) SELECT id, sent_at FROM sent",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Migration(format!("Failed to import legacy rows: {e}")))?;
        tracing::info!(imported, "Legacy `sent` table detected, imported notified identities");
    }

    let version = schema_version(conn).await?;
    tracing::info!(version, "Ledger schema ready");

    Ok(())
}

/// First column of the first row as an integer, 0 when the query yields no row.
async fn scalar(conn: &Connection, sql: &str) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query(sql, ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("`{sql}` failed: {e}")))?;

    match rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("`{sql}` returned no readable row: {e}")))?
    {
        Some(row) => row
            .get::<i64>(0)
            .map_err(|e| DatabaseError::Migration(format!("`{sql}` returned a non-integer: {e}"))),
        None => Ok(0),
    }
}

/// Ledger schema version; 0 on a fresh or pre-ledger database.
async fn schema_version(conn: &Connection) -> Result<i64, DatabaseError> {
    scalar(conn, "SELECT COALESCE(MAX(version), 0) FROM _migrations").await
}

/// True when the database still carries the notifier's old `sent` table.
async fn legacy_table_exists(conn: &Connection) -> Result<bool, DatabaseError> {
    Ok(scalar(conn, "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='sent'").await? > 0)
}

async fn mark_applied(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to mark ledger schema V{version} applied: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_conn() -> Connection {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap();
        db.connect().unwrap()
    }

    async fn count(conn: &Connection, sql: &str) -> i64 {
        let mut rows = conn.query(sql, ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        row.get(0).unwrap()
    }

    #[tokio::test]
    async fn migrations_create_ledger_table() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        for table in &["notified", "_migrations"] {
            let mut rows = conn
                .query(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    libsql::params![*table],
                )
                .await
                .unwrap();
            let row = rows.next().await.unwrap().unwrap();
            let n: i64 = row.get(0).unwrap();
            assert_eq!(n, 1, "Table '{}' should exist", table);
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();
        run_migrations(&conn).await.unwrap();

        let version = schema_version(&conn).await.unwrap();
        assert_eq!(version, 1);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM _migrations").await, 1);
    }

    #[tokio::test]
    async fn legacy_sent_rows_are_imported_once() {
        let conn = test_conn().await;
        conn.execute_batch(
            "CREATE TABLE sent (id TEXT PRIMARY KEY, sent_at TEXT NOT NULL);
             INSERT INTO sent VALUES ('555:1', '2025-01-10T08:00:00.000Z');
             INSERT INTO sent VALUES ('556:3', '2025-01-11T08:00:00.000Z');",
        )
        .await
        .unwrap();

        run_migrations(&conn).await.unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM notified").await, 2);

        // A later legacy row is not re-imported once the ledger is versioned.
        conn.execute("INSERT INTO sent VALUES ('999:1', '2025-01-12T08:00:00.000Z')", ())
            .await
            .unwrap();
        run_migrations(&conn).await.unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM notified").await, 2);
    }
}
