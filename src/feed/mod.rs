//! Disruption feed: report model and the SL deviations client.

pub mod client;
pub mod types;

pub use client::{DeviationFeed, FeedQuery, SlFeedClient};
pub use types::{AffectedLine, Deviation, MessageVariant, Priority, Publish, Scope};
