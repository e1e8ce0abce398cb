//! In-process change feed for request rows.
//!
//! Writers publish after their transaction commits; each doctor session holds
//! a broadcast receiver. The channel does not replay: a receiver that lags
//! far enough to drop events gets `RecvError::Lagged` and must re-seed its
//! view from the store, which is exactly the recovery the queue synchronizer
//! performs on any subscription error.

use thiserror::Error;
use tokio::sync::broadcast;

use crate::models::request::Request;
use crate::types::RequestId;

/// One committed row change. `Updated` carries the full row, not a diff, so
/// consumers can merge without a read-back.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Inserted(Request),
    Updated(Request),
    Deleted(RequestId),
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("change feed lagged, {0} events dropped")]
    Lagged(u64),
    #[error("change feed closed")]
    Closed,
}

impl From<broadcast::error::RecvError> for FeedError {
    fn from(err: broadcast::error::RecvError) -> Self {
        match err {
            broadcast::error::RecvError::Lagged(n) => FeedError::Lagged(n),
            broadcast::error::RecvError::Closed => FeedError::Closed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Best-effort publish. A send error only means no session is currently
    /// subscribed, which is not a failure of the write that produced it.
    pub fn publish(&self, event: ChangeEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("change feed event dropped: no subscribers");
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::{Request, RequestCategory};

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();
        let request = Request::new(RequestCategory::Prescription, None, None);
        feed.publish(ChangeEvent::Inserted(request.clone()));
        match rx.recv().await.unwrap() {
            ChangeEvent::Inserted(received) => assert_eq!(received.id, request.id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_fail() {
        let feed = ChangeFeed::new(8);
        feed.publish(ChangeEvent::Deleted(RequestId::new()));
    }

    #[tokio::test]
    async fn lagged_receiver_reports_dropped_events() {
        let feed = ChangeFeed::new(1);
        let mut rx = feed.subscribe();
        for _ in 0..3 {
            feed.publish(ChangeEvent::Deleted(RequestId::new()));
        }
        let err: FeedError = rx.recv().await.unwrap_err().into();
        assert!(matches!(err, FeedError::Lagged(_)));
    }
}
