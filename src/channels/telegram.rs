//! Telegram chat sink: posts alerts through the Bot API.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::channels::ChatSink;
use crate::error::ChannelError;

/// Per-request timeout for Bot API calls.
pub const TELEGRAM_TIMEOUT: Duration = Duration::from_secs(15);

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram channel: sends plain-text messages via `sendMessage`.
pub struct TelegramChannel {
    bot_token: SecretString,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Result<Self, ChannelError> {
        Self::with_api_base(bot_token, TELEGRAM_API_BASE)
    }

    pub fn with_api_base(
        bot_token: SecretString,
        api_base: impl Into<String>,
    ) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(TELEGRAM_TIMEOUT)
            .build()
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            bot_token,
            api_base: api_base.into(),
            client,
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }
}

/// Request body for `sendMessage`. Link previews are disabled so a digest
/// with several links stays compact.
pub fn send_message_body(chat_id: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "chat_id": chat_id,
        "text": text,
        "disable_web_page_preview": true,
    })
}

#[async_trait]
impl ChatSink for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&send_message_body(chat_id, text))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChannelError::Timeout {
                        name: "telegram".into(),
                        timeout: TELEGRAM_TIMEOUT,
                    }
                } else {
                    // reqwest errors embed the URL, which carries the bot token.
                    ChannelError::SendFailed {
                        name: "telegram".into(),
                        reason: e.without_url().to_string(),
                    }
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage returned {status}: {body}"),
            });
        }

        tracing::debug!(chat_id, chars = text.chars().count(), "Telegram message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(token: &str) -> TelegramChannel {
        TelegramChannel::new(SecretString::from(token.to_string())).unwrap()
    }

    #[test]
    fn telegram_channel_name() {
        assert_eq!(channel("fake-token").name(), "telegram");
    }

    #[test]
    fn telegram_api_url() {
        assert_eq!(
            channel("123:ABC").api_url("sendMessage"),
            "https://api.telegram.org/bot123:ABC/sendMessage"
        );
    }

    #[test]
    fn custom_api_base() {
        let ch = TelegramChannel::with_api_base(SecretString::from("t".to_string()), "http://localhost:8081")
            .unwrap();
        assert_eq!(ch.api_url("getMe"), "http://localhost:8081/bott/getMe");
    }

    #[test]
    fn body_disables_previews() {
        let body = send_message_body("-100", "hello\nworld");
        assert_eq!(body["chat_id"], "-100");
        assert_eq!(body["text"], "hello\nworld");
        assert_eq!(body["disable_web_page_preview"], true);
        assert!(body.get("parse_mode").is_none());
    }

    #[tokio::test]
    async fn unreachable_api_is_send_failure() {
        let ch = TelegramChannel::with_api_base(SecretString::from("secret-token".to_string()), "http://127.0.0.1:9")
            .unwrap();
        let err = ch.send("-100", "hi").await.unwrap_err();
        match err {
            ChannelError::SendFailed { name, reason } => {
                assert_eq!(name, "telegram");
                assert!(!reason.contains("secret-token"));
            }
            other => panic!("Expected SendFailed, got {other:?}"),
        }
    }
}
