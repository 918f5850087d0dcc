//! Command line interface.
//!
//! Every flag can also be set through a `GSA_` environment variable.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

/// Mirrors Governor groups onto Slack user groups
#[derive(Debug, Parser)]
#[command(name = "gov-slack-addon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the addon
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address the health server listens on
    #[arg(long, env = "GSA_LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Log intended Slack changes without making them
    #[arg(long, env = "GSA_DRY_RUN")]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(long, env = "GSA_DEBUG")]
    pub debug: bool,

    /// Human readable logs instead of JSON
    #[arg(long, env = "GSA_PRETTY")]
    pub pretty: bool,

    /// Audit log file, appended to
    #[arg(long, env = "GSA_AUDIT_LOG_PATH", default_value = "/app-audit/audit.log")]
    pub audit_log_path: PathBuf,

    /// Time between reconcile sweeps (e.g. 1h, 30m)
    #[arg(long, env = "GSA_RECONCILER_INTERVAL", default_value = "1h", value_parser = humantime::parse_duration)]
    pub reconciler_interval: Duration,

    /// Only sweep on the replica holding the JetStream leader lock
    #[arg(long, env = "GSA_RECONCILER_LOCKING")]
    pub reconciler_locking: bool,

    /// Added to the sweep interval to form the lock TTL
    #[arg(long, env = "GSA_LOCK_TTL_MARGIN", default_value = "10s", value_parser = humantime::parse_duration)]
    pub lock_ttl_margin: Duration,

    /// Slack bot token
    #[arg(long, env = "GSA_SLACK_TOKEN", hide_env_values = true)]
    pub slack_token: Option<String>,

    /// Prefix for the names of managed user groups
    #[arg(long, env = "GSA_SLACK_USERGROUP_PREFIX", default_value = "[Governor] ")]
    pub slack_usergroup_prefix: String,

    /// Slack Web API base URL
    #[arg(long, env = "GSA_SLACK_API_URL", default_value = gsa_02_slack::DEFAULT_API_URL)]
    pub slack_api_url: String,

    /// Governor API URL
    #[arg(long, env = "GSA_GOVERNOR_URL")]
    pub governor_url: Option<String>,

    /// OAuth client id for Governor
    #[arg(long, env = "GSA_GOVERNOR_CLIENT_ID", default_value = "gov-slack-addon-governor")]
    pub governor_client_id: String,

    /// OAuth client secret for Governor
    #[arg(long, env = "GSA_GOVERNOR_CLIENT_SECRET", hide_env_values = true)]
    pub governor_client_secret: Option<String>,

    /// OAuth token endpoint
    #[arg(long, env = "GSA_GOVERNOR_TOKEN_URL", default_value = "http://hydra:4444/oauth2/token")]
    pub governor_token_url: String,

    /// OAuth audience
    #[arg(long, env = "GSA_GOVERNOR_AUDIENCE", default_value = "http://api:3001/")]
    pub governor_audience: String,

    /// Governor application type slug of Slack workspaces
    #[arg(long, env = "GSA_GOVERNOR_APPLICATION_TYPE", default_value = "slack")]
    pub governor_application_type: String,

    /// NATS server URL
    #[arg(long, env = "GSA_NATS_URL", default_value = "nats://127.0.0.1:4222")]
    pub nats_url: String,

    /// NATS credentials file
    #[arg(long, env = "GSA_NATS_CREDS_FILE")]
    pub nats_creds_file: Option<PathBuf>,

    /// Prefix of the Governor event subjects
    #[arg(long, env = "GSA_NATS_SUBJECT_PREFIX", default_value = "governor.events")]
    pub nats_subject_prefix: String,

    /// Queue group shared by addon replicas
    #[arg(long, env = "GSA_NATS_QUEUE_GROUP", default_value = "governor.addons.gov-slack-addon")]
    pub nats_queue_group: String,

    /// Subscriptions per subject
    #[arg(long, env = "GSA_NATS_QUEUE_SIZE", default_value_t = 3)]
    pub nats_queue_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["gov-slack-addon", "serve"]).unwrap();
        let Command::Serve(args) = cli.command;

        assert_eq!(args.listen, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(args.reconciler_interval, Duration::from_secs(3600));
        assert_eq!(args.lock_ttl_margin, Duration::from_secs(10));
        assert_eq!(args.slack_usergroup_prefix, "[Governor] ");
        assert_eq!(args.nats_subject_prefix, "governor.events");
        assert_eq!(args.nats_queue_size, 3);
        assert!(!args.dry_run);
        assert!(!args.reconciler_locking);
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "gov-slack-addon",
            "serve",
            "--dry-run",
            "--reconciler-interval",
            "30m",
            "--reconciler-locking",
            "--slack-token",
            "xoxb-1",
            "--nats-queue-size",
            "5",
        ])
        .unwrap();
        let Command::Serve(args) = cli.command;

        assert!(args.dry_run);
        assert!(args.reconciler_locking);
        assert_eq!(args.reconciler_interval, Duration::from_secs(1800));
        assert_eq!(args.slack_token.as_deref(), Some("xoxb-1"));
        assert_eq!(args.nats_queue_size, 5);
    }

    #[test]
    fn test_bad_interval_rejected() {
        assert!(Cli::try_parse_from(["gov-slack-addon", "serve", "--reconciler-interval", "soon"]).is_err());
    }
}
