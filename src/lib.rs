//! SL alert relay: polls the SL deviations feed and relays new disruption
//! reports to a Telegram chat as one bilingual digest per cycle.

pub mod channels;
pub mod config;
pub mod error;
pub mod feed;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod translate;
