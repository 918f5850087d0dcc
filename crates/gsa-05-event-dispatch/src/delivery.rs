//! Concurrent delivery loop.
//!
//! Each message is handled in its own task so a slow Slack call never holds
//! up other events. On shutdown the loop stops pulling messages, drops the
//! stream (which unsubscribes), and waits for every in-flight handler.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn, Instrument};

use crate::dispatcher::{Disposition, EventDispatcher};
use crate::domain::InboundMessage;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStats {
    pub received: usize,
    pub applied: usize,
    pub failed: usize,
    pub ignored: usize,
    pub discarded: usize,
    /// Handler tasks that panicked.
    pub panicked: usize,
}

impl DeliveryStats {
    fn record(&mut self, done: Result<Disposition, JoinError>) {
        match done {
            Ok(Disposition::Applied) => self.applied += 1,
            Ok(Disposition::Failed) => self.failed += 1,
            Ok(Disposition::Ignored) => self.ignored += 1,
            Ok(Disposition::Discarded) => self.discarded += 1,
            Err(e) => {
                error!(error = %e, "event handler task failed");
                self.panicked += 1;
            }
        }
    }
}

/// Deliver `messages` to `dispatcher` until the stream ends or `shutdown`
/// flips to `true`, then drain in-flight handlers.
pub async fn run_delivery<S>(
    dispatcher: Arc<EventDispatcher>,
    messages: S,
    mut shutdown: watch::Receiver<bool>,
) -> DeliveryStats
where
    S: Stream<Item = InboundMessage> + Send + Unpin,
{
    let mut messages = messages;
    let mut in_flight: JoinSet<Disposition> = JoinSet::new();
    let mut stats = DeliveryStats::default();

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            next = messages.next() => match next {
                Some(msg) => {
                    stats.received += 1;
                    let dispatcher = dispatcher.clone();
                    in_flight.spawn(async move { dispatcher.handle(&msg).await }.in_current_span());
                }
                None => {
                    warn!("message stream ended");
                    break;
                }
            },
            Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
                stats.record(done);
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    drop(messages);

    info!(in_flight = in_flight.len(), "draining message handlers");
    while let Some(done) = in_flight.join_next().await {
        stats.record(done);
    }

    info!(
        received = stats.received,
        applied = stats.applied,
        failed = stats.failed,
        "message delivery stopped"
    );

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingActions;
    use futures::channel::mpsc;
    use std::time::Duration;

    fn dispatcher(actions: Arc<RecordingActions>) -> Arc<EventDispatcher> {
        Arc::new(EventDispatcher::new(actions, "nats://nats:4222", "q"))
    }

    fn member_event(user: &str) -> InboundMessage {
        InboundMessage::new(
            "governor.events.members",
            format!(r#"{{"action":"CREATE","group_id":"g1","user_id":"{user}"}}"#).into_bytes(),
        )
    }

    #[tokio::test]
    async fn test_delivers_until_stream_ends() {
        let actions = Arc::new(RecordingActions::default());
        let (_tx, rx) = watch::channel(false);
        let messages = futures::stream::iter(vec![
            member_event("u1"),
            member_event("u2"),
            InboundMessage::new("governor.events.members", b"{}".to_vec()),
        ]);

        let stats = run_delivery(dispatcher(actions.clone()), messages, rx).await;

        assert_eq!(stats.received, 3);
        assert_eq!(stats.applied, 2);
        assert_eq!(stats.discarded, 1);

        let mut ops = actions.ops();
        ops.sort();
        assert_eq!(ops, vec!["add g1 u1", "add g1 u2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drains_in_flight_handlers() {
        let actions = Arc::new(RecordingActions::slow(Duration::from_secs(5)));
        let (msg_tx, msg_rx) = mpsc::unbounded();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_delivery(dispatcher(actions.clone()), msg_rx, shutdown_rx));

        msg_tx.unbounded_send(member_event("u1")).unwrap();
        msg_tx.unbounded_send(member_event("u2")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(actions.ops().is_empty());

        shutdown_tx.send(true).unwrap();
        let stats = handle.await.unwrap();

        assert_eq!(stats.received, 2);
        assert_eq!(stats.applied, 2);
        assert_eq!(actions.ops().len(), 2);
    }

    #[tokio::test]
    async fn test_no_messages_pulled_after_shutdown() {
        let actions = Arc::new(RecordingActions::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        let stats = run_delivery(
            dispatcher(actions.clone()),
            futures::stream::iter(vec![member_event("u1")]),
            shutdown_rx,
        )
        .await;

        assert_eq!(stats, DeliveryStats::default());
        assert!(actions.ops().is_empty());
    }
}
