//! # Addon Configuration
//!
//! Parsed flags become one explicit [`AddonConfig`] value handed to the
//! constructors that need it.
//!
//! ## Mandatory settings
//!
//! NATS URL and credentials file, Slack token, and every Governor
//! connection parameter. [`AddonConfig::validate`] reports all missing
//! settings at once so a misconfigured deployment fails on first start.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use gsa_01_leader_lock::lock_ttl;
use gsa_04_reconciler::ReconcilerConfig;
use thiserror::Error;

use crate::cli::ServeArgs;

/// JetStream KV bucket holding the leader lock.
pub const LOCK_BUCKET: &str = "gov-slack-addon-lock";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete addon configuration.
#[derive(Debug, Clone)]
pub struct AddonConfig {
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    pub audit: AuditConfig,
    pub reconciler: ReconcilerSettings,
    pub slack: SlackSettings,
    pub governor: GovernorSettings,
    pub nats: NatsSettings,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub listen: SocketAddr,
}

#[derive(Debug, Clone, Copy)]
pub struct LoggingConfig {
    pub debug: bool,
    pub pretty: bool,
}

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub log_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub interval: Duration,
    pub dry_run: bool,
    pub locking: bool,
    pub lock_ttl_margin: Duration,
    pub user_group_prefix: String,
    pub application_type: String,
}

#[derive(Clone)]
pub struct SlackSettings {
    pub token: String,
    pub api_url: String,
}

impl std::fmt::Debug for SlackSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackSettings")
            .field("token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Clone)]
pub struct GovernorSettings {
    pub url: String,
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub audience: String,
}

impl std::fmt::Debug for GovernorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernorSettings")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .field("audience", &self.audience)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct NatsSettings {
    pub url: String,
    pub creds_file: PathBuf,
    pub subject_prefix: String,
    pub queue_group: String,
    pub queue_size: usize,
}

impl AddonConfig {
    /// Build and validate the configuration from parsed flags.
    pub fn from_args(args: ServeArgs) -> Result<Self, ConfigError> {
        let config = Self {
            http: HttpConfig {
                listen: args.listen,
            },
            logging: LoggingConfig {
                debug: args.debug,
                pretty: args.pretty,
            },
            audit: AuditConfig {
                log_path: args.audit_log_path,
            },
            reconciler: ReconcilerSettings {
                interval: args.reconciler_interval,
                dry_run: args.dry_run,
                locking: args.reconciler_locking,
                lock_ttl_margin: args.lock_ttl_margin,
                user_group_prefix: args.slack_usergroup_prefix,
                application_type: args.governor_application_type,
            },
            slack: SlackSettings {
                token: args.slack_token.unwrap_or_default(),
                api_url: args.slack_api_url,
            },
            governor: GovernorSettings {
                url: args.governor_url.unwrap_or_default(),
                client_id: args.governor_client_id,
                client_secret: args.governor_client_secret.unwrap_or_default(),
                token_url: args.governor_token_url,
                audience: args.governor_audience,
            },
            nats: NatsSettings {
                url: args.nats_url,
                creds_file: args.nats_creds_file.unwrap_or_default(),
                subject_prefix: args.nats_subject_prefix,
                queue_group: args.nats_queue_group,
                queue_size: args.nats_queue_size,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("nats url", self.nats.url.is_empty()),
            ("nats creds file", self.nats.creds_file.as_os_str().is_empty()),
            ("slack token", self.slack.token.is_empty()),
            ("governor url", self.governor.url.is_empty()),
            ("governor client id", self.governor.client_id.is_empty()),
            ("governor client secret", self.governor.client_secret.is_empty()),
            ("governor token url", self.governor.token_url.is_empty()),
            ("governor audience", self.governor.audience.is_empty()),
        ];

        let missing: Vec<&'static str> = required
            .into_iter()
            .filter_map(|(name, empty)| empty.then_some(name))
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        if self.reconciler.interval.is_zero() {
            return Err(ConfigError::Invalid("reconciler interval must be positive".into()));
        }

        if self.nats.queue_size == 0 {
            return Err(ConfigError::Invalid("nats queue size must be at least 1".into()));
        }

        Ok(())
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            user_group_prefix: self.reconciler.user_group_prefix.clone(),
            application_type: self.reconciler.application_type.clone(),
            dry_run: self.reconciler.dry_run,
            interval: self.reconciler.interval,
        }
    }

    /// Leader lock TTL: one sweep interval plus the margin.
    pub fn lock_ttl(&self) -> Duration {
        lock_ttl(self.reconciler.interval, self.reconciler.lock_ttl_margin)
    }
}
