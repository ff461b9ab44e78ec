//! libSQL backend: async `Ledger` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{Ledger, MIN_RETENTION_DAYS};

/// libSQL ledger backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlLedger {
    /// Never read; held so the database outlives `conn`.
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlLedger {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let ledger = Self::from_database(db).await?;
        info!(path = %path.display(), "Ledger opened");
        Ok(ledger)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Record `identity` with an explicit timestamp.
    pub async fn record_notified_at(
        &self,
        identity: &str,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO notified (identity, recorded_at) VALUES (?1, ?2)",
                params![identity, format_timestamp(recorded_at)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("record_notified: {e}")))?;

        debug!(identity, "Identity recorded in ledger");
        Ok(())
    }

    /// Delete records older than `max_age_days` relative to `now`.
    pub async fn prune_before(
        &self,
        max_age_days: u32,
        now: DateTime<Utc>,
    ) -> Result<usize, DatabaseError> {
        let keep_days = max_age_days.max(MIN_RETENTION_DAYS);
        let cutoff = now - chrono::Duration::days(i64::from(keep_days));

        // datetime() normalises both our format and the legacy `...Z` rows.
        let count = self
            .conn()
            .execute(
                "DELETE FROM notified WHERE datetime(recorded_at) < datetime(?1)",
                params![format_timestamp(cutoff)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("prune: {e}")))?;

        if count > 0 {
            info!(count, keep_days, "Pruned old ledger records");
        }
        Ok(count as usize)
    }

    /// Number of records currently held.
    pub async fn len(&self) -> Result<usize, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM notified", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("len: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let n: i64 = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("len row parse: {e}")))?;
                Ok(n as usize)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("len: {e}"))),
        }
    }

    pub async fn is_empty(&self) -> Result<bool, DatabaseError> {
        Ok(self.len().await? == 0)
    }
}

/// RFC 3339 UTC with millisecond precision.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl Ledger for LibSqlLedger {
    async fn already_notified(&self, identity: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT 1 FROM notified WHERE identity = ?1",
                params![identity],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("already_notified: {e}")))?;

        match rows.next().await {
            Ok(row) => Ok(row.is_some()),
            Err(e) => Err(DatabaseError::Query(format!("already_notified: {e}"))),
        }
    }

    async fn record_notified(&self, identity: &str) -> Result<(), DatabaseError> {
        self.record_notified_at(identity, Utc::now()).await
    }

    async fn prune(&self, max_age_days: u32) -> Result<usize, DatabaseError> {
        self.prune_before(max_age_days, Utc::now()).await
    }
}
