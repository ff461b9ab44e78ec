//! Chat sinks: where rendered alerts are delivered.

pub mod telegram;

use async_trait::async_trait;

use crate::error::ChannelError;

pub use telegram::TelegramChannel;

/// Delivers one pre-rendered text blob to one destination.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Channel name, used in logs and errors.
    fn name(&self) -> &str;

    async fn send(&self, destination: &str, text: &str) -> Result<(), ChannelError>;
}
