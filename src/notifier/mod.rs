/// Live state notifier.
/// Best-effort push of auction events to connected SSE clients. The registry is
/// process memory only; clients still poll for anything correctness-critical.
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use axum::response::sse::Event;
use futures::stream::Stream;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, info, warn};

// endregion: --- Imports

// region:    --- Live Notifier

pub const RESYNC_EVENT: &str = "resync";

#[derive(Clone)]
pub struct LiveNotifier {
    sender: broadcast::Sender<AuctionEvent>,
}

impl Default for LiveNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl LiveNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Pushes an event to every open channel and returns how many received it.
    pub fn publish(&self, event: AuctionEvent) -> usize {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(
                    "{:<12} --> {} delivered to {} client(s)",
                    "Notifier", kind, receivers
                );
                receivers
            }
            // no subscribers is fine, clients poll
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuctionEvent> {
        self.sender.subscribe()
    }

    pub fn connection_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

// endregion: --- Live Notifier

// region:    --- SSE Stream

pub struct LiveStream {
    pub receiver: tokio_mpsc::Receiver<Result<Event, Infallible>>,
}

impl Stream for LiveStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// What the relay hands to a client next.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveMessage {
    Event(AuctionEvent),
    /// The client fell behind and missed this many events.
    Resync(u64),
}

impl LiveMessage {
    pub fn into_sse(self) -> Event {
        match self {
            LiveMessage::Event(event) => to_sse_event(&event),
            LiveMessage::Resync(skipped) => {
                Event::default().event(RESYNC_EVENT).data(skipped.to_string())
            }
        }
    }
}

/// Next message for one client, `None` once the notifier is gone.
pub async fn next_message(events: &mut broadcast::Receiver<AuctionEvent>) -> Option<LiveMessage> {
    match events.recv().await {
        Ok(event) => Some(LiveMessage::Event(event)),
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            warn!(
                "{:<12} --> client lagged, {} event(s) dropped",
                "Notifier", skipped
            );
            Some(LiveMessage::Resync(skipped))
        }
        Err(broadcast::error::RecvError::Closed) => None,
    }
}

/// Opens a client channel: a forwarding task relays broadcast events into the
/// SSE stream until either side goes away.
pub fn live_stream(notifier: &LiveNotifier) -> LiveStream {
    let mut events = notifier.subscribe();
    let (tx, rx) = tokio_mpsc::channel(32);
    info!(
        "{:<12} --> client connected ({} open)",
        "Notifier",
        notifier.connection_count()
    );

    tokio::spawn(async move {
        while let Some(message) = next_message(&mut events).await {
            if tx.send(Ok(message.into_sse())).await.is_err() {
                break;
            }
        }
        debug!("{:<12} --> client disconnected", "Notifier");
    });

    LiveStream { receiver: rx }
}

pub fn to_sse_event(event: &AuctionEvent) -> Event {
    let sse_event = Event::default().event(event.kind());
    match serde_json::to_string(event) {
        Ok(json) => sse_event.data(json),
        Err(e) => {
            warn!("{:<12} --> event serialization failed: {:?}", "Notifier", e);
            Event::default().event(RESYNC_EVENT).data("0")
        }
    }
}

// endregion: --- SSE Stream

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn publish_without_clients_is_not_an_error() {
        let notifier = LiveNotifier::new(8);
        assert_eq!(notifier.publish(AuctionEvent::LotCreated { lot_id: 1 }), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let notifier = LiveNotifier::new(8);
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();
        assert_eq!(notifier.connection_count(), 2);

        let event = AuctionEvent::PhaseChanged {
            current_phase: "auction".to_string(),
        };
        assert_eq!(notifier.publish(event.clone()), 2);
        assert_eq!(first.recv().await.unwrap(), event);
        assert_eq!(second.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn live_stream_forwards_events() {
        let notifier = LiveNotifier::new(8);
        let mut stream = live_stream(&notifier);
        assert_eq!(notifier.connection_count(), 1);

        notifier.publish(AuctionEvent::LotCreated { lot_id: 7 });
        let forwarded = tokio::time::timeout(std::time::Duration::from_secs(1), stream.next())
            .await
            .expect("event not forwarded in time");
        assert!(matches!(forwarded, Some(Ok(_))));
    }

    #[tokio::test]
    async fn lagging_client_gets_resync() {
        let notifier = LiveNotifier::new(1);
        let mut events = notifier.subscribe();
        for lot_id in 1..=3 {
            notifier.publish(AuctionEvent::LotCreated { lot_id });
        }

        assert_eq!(next_message(&mut events).await, Some(LiveMessage::Resync(2)));
        assert_eq!(
            next_message(&mut events).await,
            Some(LiveMessage::Event(AuctionEvent::LotCreated { lot_id: 3 }))
        );
    }

    #[tokio::test]
    async fn closed_notifier_ends_the_relay() {
        let notifier = LiveNotifier::new(4);
        let mut events = notifier.subscribe();
        drop(notifier);
        assert_eq!(next_message(&mut events).await, None);
    }

    #[tokio::test]
    async fn dropping_stream_releases_subscription() {
        let notifier = LiveNotifier::new(8);
        let stream = live_stream(&notifier);
        drop(stream);

        // forwarding task notices on the next send
        notifier.publish(AuctionEvent::LotCreated { lot_id: 1 });
        for _ in 0..50 {
            if notifier.connection_count() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(notifier.connection_count(), 0);
    }
}
// endregion: --- Tests
