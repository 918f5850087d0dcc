//! # Addon Runtime
//!
//! Wires the components together and owns the shutdown sequence.
//!
//! ## Startup
//!
//! 1. Build the Governor and Slack clients and open the audit log
//! 2. Connect to NATS (and the JetStream lock bucket when locking)
//! 3. Start the health server, the sweep driver and the message delivery loop
//!
//! ## Shutdown
//!
//! On SIGINT/SIGTERM the watch channel flips to `true`. Delivery stops
//! pulling messages and drains in-flight handlers, the sweep loop exits and
//! gives up the leader lock, and the health server gets a bounded grace
//! period to finish.

use std::fs::OpenOptions;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use gsa_01_leader_lock::LeaderLock;
use gsa_02_slack::{HttpSlackApi, SlackClient};
use gsa_03_governor::{ClientCredentials, HttpGovernorClient, TokenSource, DEFAULT_SCOPES};
use gsa_04_reconciler::{Reconciler, SweepDriver};
use gsa_05_event_dispatch::{run_delivery, EventDispatcher};
use shared_types::{AuditSink, JsonLinesAuditWriter};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn, Instrument};

use crate::adapters::{self, JetStreamLockStore};
use crate::config::{AddonConfig, LOCK_BUCKET};
use crate::health;

/// Grace period for the health server after the shutdown signal.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct AddonRuntime {
    config: AddonConfig,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl AddonRuntime {
    pub fn new(config: AddonConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Handle that triggers shutdown when sent `true`.
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }

    fn build_reconciler(&self, http: reqwest::Client) -> Result<Reconciler> {
        let gov = &self.config.governor;
        let tokens = TokenSource::new(
            ClientCredentials {
                client_id: gov.client_id.clone(),
                client_secret: gov.client_secret.clone(),
                token_url: gov.token_url.clone(),
                audience: gov.audience.clone(),
                scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            },
            http.clone(),
        );
        let governor = HttpGovernorClient::new(gov.url.clone(), tokens, http.clone());

        let slack = SlackClient::new(Arc::new(HttpSlackApi::with_base_url(
            self.config.slack.api_url.clone(),
            self.config.slack.token.clone(),
            http,
        )));

        let path = &self.config.audit.log_path;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating audit log directory {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening audit log {}", path.display()))?;
        let audit: Arc<dyn AuditSink> = Arc::new(JsonLinesAuditWriter::new(file));

        Ok(
            Reconciler::new(self.config.reconciler_config(), slack, Arc::new(governor))
                .with_audit_sink(audit),
        )
    }

    /// Run until a shutdown signal arrives.
    pub async fn run(&self) -> Result<()> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building http client")?;

        let reconciler = Arc::new(self.build_reconciler(http)?);

        let nats = adapters::connect(&self.config.nats).await?;

        let mut sweep = SweepDriver::new(reconciler.clone());
        if self.config.reconciler.locking {
            let js = async_nats::jetstream::new(nats.clone());
            let store = JetStreamLockStore::open(&js, LOCK_BUCKET, self.config.lock_ttl())
                .await
                .context("opening leader lock bucket")?;
            sweep = sweep.with_lock(LeaderLock::new(Arc::new(store)));
        }
        let sweep = Arc::new(sweep);

        let listener = TcpListener::bind(self.config.http.listen)
            .await
            .with_context(|| format!("binding health server to {}", self.config.http.listen))?;
        info!(listen = %self.config.http.listen, "starting health server");

        let mut http_shutdown = self.shutdown_rx.clone();
        let server = tokio::spawn(
            health::serve(listener, async move {
                let _ = http_shutdown.wait_for(|stop| *stop).await;
            })
            .in_current_span(),
        );

        let sweep_task = {
            let sweep = sweep.clone();
            let shutdown = self.shutdown_rx.clone();
            tokio::spawn(async move { sweep.run(shutdown).await }.in_current_span())
        };

        let dispatcher = Arc::new(EventDispatcher::new(
            reconciler.clone(),
            adapters::redact_url(&self.config.nats.url),
            self.config.nats.queue_group.clone(),
        ));
        let messages = adapters::subscribe(&nats, &self.config.nats).await?;
        let delivery = tokio::spawn(
            run_delivery(dispatcher, messages, self.shutdown_rx.clone()).in_current_span(),
        );

        info!(dry_run = self.config.reconciler.dry_run, "gov-slack-addon is running");

        shutdown_signal().await;
        if self.shutdown_tx.send(true).is_err() {
            warn!("no shutdown listeners left");
        }

        match delivery.await {
            Ok(stats) => info!(received = stats.received, "message delivery drained"),
            Err(e) => error!(error = %e, "message delivery task failed"),
        }

        if let Err(e) = sweep_task.await {
            error!(error = %e, "reconciler task failed");
        }
        sweep.stop().await;

        if let Err(e) = nats.flush().await {
            warn!(error = %e, "error flushing nats connection");
        }

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => error!(error = %e, "health server failed"),
            Ok(Err(e)) => error!(error = %e, "health server task failed"),
            Err(_) => warn!("health server did not stop within the grace period"),
        }

        info!("server shutdown cleanly");
        Ok(())
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
