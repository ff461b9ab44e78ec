//! `Ledger` trait: the single source of truth for what has been relayed.

use async_trait::async_trait;

use crate::error::DatabaseError;

/// Retention windows shorter than this are clamped up.
pub const MIN_RETENTION_DAYS: u32 = 1;

/// Persistent store of notified identities (`"{case_id}:{version}"`).
///
/// Reads may run concurrently with the single writer.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// True iff `identity` has been recorded.
    async fn already_notified(&self, identity: &str) -> Result<bool, DatabaseError>;

    /// Record `identity` with the current time. Recording twice is harmless.
    async fn record_notified(&self, identity: &str) -> Result<(), DatabaseError>;

    /// Delete records older than `max_age_days` (clamped to at least one day).
    /// Returns the number of records removed.
    async fn prune(&self, max_age_days: u32) -> Result<usize, DatabaseError>;
}
