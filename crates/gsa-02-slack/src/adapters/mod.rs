//! Slack API adapters

pub mod http;
