//! NATS connection and Governor event subscriptions.

use anyhow::{Context, Result};
use futures::stream::{self, BoxStream, SelectAll};
use futures::StreamExt;
use gsa_05_event_dispatch::{EventFamily, InboundMessage};
use shared_types::APP_NAME;
use reqwest::Url;
use tracing::{debug, info};

use crate::config::NatsSettings;

const MASK: &str = "xxxxx";

/// All subscriptions merged into one message stream.
pub type EventStream = SelectAll<BoxStream<'static, InboundMessage>>;

pub async fn connect(settings: &NatsSettings) -> Result<async_nats::Client> {
    let options = async_nats::ConnectOptions::with_credentials_file(&settings.creds_file)
        .await
        .with_context(|| format!("reading nats credentials {}", settings.creds_file.display()))?
        .name(APP_NAME);

    let client = options
        .connect(settings.url.as_str())
        .await
        .with_context(|| format!("connecting to nats at {}", redact_url(&settings.url)))?;

    info!(nats_url = %redact_url(&settings.url), "connected to nats");
    Ok(client)
}

/// Queue-subscribe `queue_size` times to each event subject.
pub async fn subscribe(client: &async_nats::Client, settings: &NatsSettings) -> Result<EventStream> {
    debug!(
        nats_prefix = %settings.subject_prefix,
        nats_queue_group = %settings.queue_group,
        "registering subscription handlers"
    );

    let mut subscriptions = Vec::with_capacity(settings.queue_size * EventFamily::ALL.len());

    for n in 1..=settings.queue_size {
        for family in EventFamily::ALL {
            let subject = family.subject(&settings.subject_prefix);
            let subscriber = client
                .queue_subscribe(subject.clone(), settings.queue_group.clone())
                .await
                .with_context(|| format!("subscribing to {subject}"))?;

            debug!(nats_subscriber_id = %format!("{subject}-{n}"), "added subscriber");

            subscriptions.push(
                subscriber
                    .map(|msg| InboundMessage::new(msg.subject.to_string(), msg.payload))
                    .boxed(),
            );
        }
    }

    Ok(stream::select_all(subscriptions))
}

/// Server URL with any credentials masked, for logs and audit records.
/// Comma separated server lists are masked entry by entry.
pub fn redact_url(url: &str) -> String {
    url.split(',')
        .map(|server| redact_server(server.trim()))
        .collect::<Vec<_>>()
        .join(",")
}

fn redact_server(server: &str) -> String {
    let Ok(mut parsed) = Url::parse(server) else {
        return server.to_string();
    };

    let masked = if parsed.password().is_some() {
        parsed.set_password(Some(MASK))
    } else if !parsed.username().is_empty() {
        // Bare userinfo is a token.
        parsed.set_username(MASK)
    } else {
        return server.to_string();
    };

    match masked {
        Ok(()) => parsed.to_string(),
        Err(()) => server.to_string(),
    }
}
