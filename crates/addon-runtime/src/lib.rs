//! # gov-slack-addon Runtime
//!
//! Library half of the `gov-slack-addon` binary, exposed for tests.
//!
//! ```text
//!   NATS (queue group) ──→ adapters::nats ──→ EventDispatcher ─┐
//!                                                               ├──→ Reconciler ──→ Slack
//!   JetStream KV lock ──→ adapters::kv_lock ──→ SweepDriver ───┘        │
//!                                                                       └──→ Governor
//!   health::router  (/healthz, liveness, readiness)
//! ```
//!
//! - `cli` - clap flags, each with a `GSA_` environment variable
//! - `config` - validated [`AddonConfig`]
//! - `logging` - tracing subscriber setup
//! - `app` - component wiring and graceful shutdown

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config;
pub mod health;
pub mod logging;

pub use app::AddonRuntime;
pub use cli::{Cli, Command, ServeArgs};
pub use config::{AddonConfig, ConfigError};
