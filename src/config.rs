//! Configuration types, built from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Lines watched when `LINES` is unset or has no usable entries.
pub const DEFAULT_LINES: [i64; 3] = [17, 18, 19];

/// Telegram delivery credentials. Both are mandatory.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub chat_id: String,
}

/// Parameters handed to the poll cycle on every run.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// Transport mode queried from the feed and assumed for untagged reports.
    pub transport_mode: String,
    /// Line numbers queried from the feed.
    pub lines: Vec<i64>,
    /// Whether to include reports that are not yet in effect.
    pub include_future: bool,
    /// Variant language picked when no native-language variant exists.
    pub preferred_language: String,
    /// Language the digest summaries are translated into.
    pub target_language: String,
    /// Ledger retention window.
    pub prune_days: u32,
    /// Prune the ledger every N completed cycles.
    pub prune_every: u64,
    /// Maximum number of reports enriched concurrently.
    pub enrich_concurrency: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            transport_mode: "METRO".to_string(),
            lines: DEFAULT_LINES.to_vec(),
            include_future: false,
            preferred_language: "sv".to_string(),
            target_language: "en".to_string(),
            prune_days: 14,
            prune_every: 60,
            enrich_concurrency: 4,
        }
    }
}

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub telegram: TelegramConfig,
    pub cycle: CycleConfig,
    /// Periodic trigger interval. `None` disables the timer (on-demand only).
    pub poll_interval: Option<Duration>,
    pub state_db: PathBuf,
    pub port: u16,
}

impl NotifierConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()))?;
        let chat_id = lookup("TELEGRAM_CHAT_ID")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_CHAT_ID".into()))?;

        let defaults = CycleConfig::default();

        let transport_mode = lookup("TRANSPORT_MODE")
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().to_uppercase())
            .unwrap_or(defaults.transport_mode);

        let lines = lookup("LINES")
            .map(|raw| parse_lines(&raw))
            .filter(|lines| !lines.is_empty())
            .unwrap_or(defaults.lines);

        let include_future = lookup("FUTURE")
            .map(|s| s.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.include_future);

        let preferred_language = lookup("PREFERRED_LANG")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.preferred_language);

        let target_language = lookup("TARGET_LANG")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.target_language);

        let prune_days: u32 = parse_or("PRUNE_DAYS", &lookup, defaults.prune_days)?;
        let prune_every: u64 = parse_or("PRUNE_EVERY", &lookup, defaults.prune_every)?.max(1);

        let poll_interval_secs: u64 = parse_or("POLL_INTERVAL_SECS", &lookup, 60)?;
        let poll_interval = (poll_interval_secs > 0).then(|| Duration::from_secs(poll_interval_secs));

        let state_db = lookup("STATE_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("state.db"));

        let port: u16 = parse_or("PORT", &lookup, 3000)?;

        Ok(Self {
            telegram: TelegramConfig {
                bot_token: SecretString::from(bot_token),
                chat_id,
            },
            cycle: CycleConfig {
                transport_mode,
                lines,
                include_future,
                preferred_language,
                target_language,
                prune_days,
                prune_every,
                enrich_concurrency: defaults.enrich_concurrency,
            },
            poll_interval,
            state_db,
            port,
        })
    }
}

/// Parse a comma-separated line list, dropping blank and non-numeric entries.
pub fn parse_lines(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })
        }
        _ => Ok(default),
    }
}
