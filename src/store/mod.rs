//! Persistence layer: the "already notified" ledger.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlLedger;
pub use traits::{Ledger, MIN_RETENTION_DAYS};
