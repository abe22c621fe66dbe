use chrono::Utc;
use relayer_model::Event;
use tokio::sync::broadcast;

/// A handle to the unified event stream. Wraps a [`broadcast::Receiver`] and
/// turns a `Lagged` error into a first-class `Event::SubscriberLagged` item
/// instead of making every caller match on the channel's own error type.
pub struct Subscription {
    inner: broadcast::Receiver<Event>,
}

impl Subscription {
    pub(crate) fn new(inner: broadcast::Receiver<Event>) -> Self {
        Self { inner }
    }

    /// Awaits the next event. Returns `None` only once the publisher side
    /// has been dropped entirely, which does not happen while the
    /// [`crate::EventMonitor`] that owns the sender is alive.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.inner.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Some(Event::SubscriberLagged {
                        skipped,
                        timestamp: Utc::now(),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
