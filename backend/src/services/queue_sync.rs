//! Per-session synchronization of the review queue.
//!
//! Each connected doctor holds a private `QueueView`, seeded by a full fetch
//! and then driven by change-feed events through a reducer. Nothing here is
//! shared across sessions; cross-session consistency comes only from the
//! feed. The reducer is pure over (event, now) so scripted event sequences
//! can be replayed in tests without any live store.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::mpsc;
use utoipa::ToSchema;

use crate::db::change_feed::{ChangeEvent, ChangeFeed};
use crate::db::connection::DbPool;
use crate::models::queue_item::QueueItem;
use crate::models::request::Request;
use crate::repositories::RequestRepositoryTrait;
use crate::sla::queue_ordering;
use crate::types::RequestId;
use std::sync::Arc;

/// How often the background tick re-examines staleness.
pub const STALENESS_CHECK_SECS: u64 = 30;
/// Quiet period after which the view is flagged as possibly out of date.
const STALENESS_AFTER_SECS: i64 = 60;

/// What a doctor's session renders: the sorted queue plus an out-of-date
/// indicator backing the manual-refresh affordance.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueueSnapshot {
    pub items: Vec<QueueItem>,
    pub stale: bool,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct QueueView {
    items: HashMap<RequestId, Request>,
    last_sync_time: Option<DateTime<Utc>>,
    stale: bool,
    needs_refetch: bool,
}

impl QueueView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces local state with a fresh full fetch. Clears staleness and
    /// any pending refetch; this is also the recovery path after feed loss,
    /// since missed events cannot be replayed.
    pub fn seed(&mut self, requests: Vec<Request>, now: DateTime<Utc>) {
        self.items = requests
            .into_iter()
            .filter(Request::is_queue_visible)
            .map(|request| (request.id, request))
            .collect();
        self.last_sync_time = Some(now);
        self.stale = false;
        self.needs_refetch = false;
    }

    /// Reducer over one change-feed event.
    pub fn apply(&mut self, event: &ChangeEvent, now: DateTime<Utc>) {
        match event {
            ChangeEvent::Inserted(request) => {
                if request.is_queue_visible() {
                    // Insert provisionally, but insert events may predate
                    // computed fields like the SLA deadline; a full re-fetch
                    // is the source of truth.
                    self.items.insert(request.id, request.clone());
                    self.needs_refetch = true;
                }
            }
            ChangeEvent::Updated(request) => {
                if request.is_queue_visible() {
                    self.items.insert(request.id, request.clone());
                } else {
                    self.items.remove(&request.id);
                }
            }
            ChangeEvent::Deleted(id) => {
                self.items.remove(id);
            }
        }
        self.last_sync_time = Some(now);
        self.stale = false;
    }

    /// Flags the view stale when the feed has been quiet too long. Returns
    /// true if the flag flipped.
    pub fn check_staleness(&mut self, now: DateTime<Utc>) -> bool {
        let quiet = match self.last_sync_time {
            Some(last) => now - last > Duration::seconds(STALENESS_AFTER_SECS),
            None => true,
        };
        let flipped = quiet != self.stale;
        self.stale = quiet;
        flipped
    }

    /// Marks the view stale immediately (subscription error or lag).
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn needs_refetch(&self) -> bool {
        self.needs_refetch
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.items.contains_key(&id)
    }

    /// Projects and sorts the current view for display.
    pub fn render(&self, now: DateTime<Utc>) -> Vec<QueueItem> {
        let mut items: Vec<QueueItem> = self
            .items
            .values()
            .map(|request| QueueItem::project(request, now))
            .collect();
        items.sort_by(queue_ordering);
        items
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> QueueSnapshot {
        QueueSnapshot {
            items: self.render(now),
            stale: self.stale,
            generated_at: now,
        }
    }
}

/// Background task backing one doctor's live queue stream. Consumes the
/// change feed, reseeds on insert/lag/error, ticks for staleness, and pushes
/// a snapshot into `tx` after every state change. Exits when the consumer
/// goes away.
pub struct QueueSession {
    pool: DbPool,
    requests: Arc<dyn RequestRepositoryTrait>,
    feed: ChangeFeed,
}

impl QueueSession {
    pub fn new(pool: DbPool, requests: Arc<dyn RequestRepositoryTrait>, feed: ChangeFeed) -> Self {
        Self {
            pool,
            requests,
            feed,
        }
    }

    pub async fn run(self, tx: mpsc::Sender<QueueSnapshot>) {
        let mut view = QueueView::new();
        let mut receiver = self.feed.subscribe();
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(STALENESS_CHECK_SECS));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        self.reseed(&mut view).await;
        if tx.send(view.snapshot(Utc::now())).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                event = receiver.recv() => {
                    match event {
                        Ok(event) => {
                            view.apply(&event, Utc::now());
                            if view.needs_refetch() {
                                self.reseed(&mut view).await;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "queue feed interrupted; reseeding");
                            view.mark_stale();
                            receiver = self.feed.subscribe();
                            self.reseed(&mut view).await;
                        }
                    }
                    if tx.send(view.snapshot(Utc::now())).await.is_err() {
                        return;
                    }
                }
                _ = tick.tick() => {
                    if view.check_staleness(Utc::now())
                        && tx.send(view.snapshot(Utc::now())).await.is_err()
                    {
                        return;
                    }
                }
            }
        }
    }

    async fn reseed(&self, view: &mut QueueView) {
        match self.requests.list_review_queue(&self.pool).await {
            Ok(requests) => view.seed(requests, Utc::now()),
            Err(err) => {
                // Keep serving the old view, flagged as possibly out of date.
                tracing::error!(error = ?err, "queue reseed failed");
                view.mark_stale();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::{PaymentStatus, Request, RequestCategory, RequestStatus};

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z").unwrap().to_utc()
            + Duration::seconds(seconds)
    }

    fn paid(status: RequestStatus) -> Request {
        let mut request = Request::new(RequestCategory::MedicalCertificate, None, None);
        request.status = status;
        request.payment_status = PaymentStatus::Paid;
        request
    }

    #[test]
    fn seed_keeps_only_visible_requests() {
        let mut view = QueueView::new();
        let visible = paid(RequestStatus::Pending);
        let unpaid = Request::new(RequestCategory::Prescription, None, None);
        let terminal = paid(RequestStatus::Approved);

        view.seed(vec![visible.clone(), unpaid.clone(), terminal], at(0));
        assert_eq!(view.len(), 1);
        assert!(view.contains(visible.id));
        assert!(!view.contains(unpaid.id));
    }

    #[test]
    fn unpaid_request_never_appears_even_while_pending() {
        let mut view = QueueView::new();
        let unpaid = Request::new(RequestCategory::MedicalCertificate, None, None);
        assert!(matches!(unpaid.status, RequestStatus::Pending));

        view.apply(&ChangeEvent::Inserted(unpaid.clone()), at(1));
        assert!(view.is_empty());
        view.apply(&ChangeEvent::Updated(unpaid.clone()), at(2));
        assert!(view.is_empty());
    }

    #[test]
    fn insert_adds_provisionally_and_requests_refetch() {
        let mut view = QueueView::new();
        let request = paid(RequestStatus::Pending);

        view.apply(&ChangeEvent::Inserted(request.clone()), at(1));
        assert!(view.contains(request.id));
        assert!(view.needs_refetch());
    }

    #[test]
    fn update_merges_and_removes_when_leaving_active_set() {
        let mut view = QueueView::new();
        let mut request = paid(RequestStatus::Pending);
        view.seed(vec![request.clone()], at(0));

        request.status = RequestStatus::InReview;
        view.apply(&ChangeEvent::Updated(request.clone()), at(5));
        assert!(view.contains(request.id));

        request.status = RequestStatus::Declined;
        view.apply(&ChangeEvent::Updated(request.clone()), at(6));
        assert!(!view.contains(request.id));
    }

    #[test]
    fn delete_removes_item() {
        let mut view = QueueView::new();
        let request = paid(RequestStatus::Pending);
        view.seed(vec![request.clone()], at(0));

        view.apply(&ChangeEvent::Deleted(request.id), at(3));
        assert!(view.is_empty());
    }

    #[test]
    fn view_goes_stale_after_a_quiet_minute_and_recovers_on_event() {
        let mut view = QueueView::new();
        view.seed(vec![], at(0));

        assert!(!view.check_staleness(at(30)));
        assert!(!view.is_stale());

        assert!(view.check_staleness(at(61)));
        assert!(view.is_stale());

        // Any received event counts as contact with the feed.
        view.apply(&ChangeEvent::Deleted(RequestId::new()), at(62));
        assert!(!view.is_stale());
        assert!(!view.check_staleness(at(90)));
    }

    #[test]
    fn reseed_clears_staleness() {
        let mut view = QueueView::new();
        view.seed(vec![], at(0));
        view.check_staleness(at(120));
        assert!(view.is_stale());

        view.seed(vec![paid(RequestStatus::Pending)], at(121));
        assert!(!view.is_stale());
        assert!(!view.check_staleness(at(150)));
    }

    #[test]
    fn render_orders_by_queue_policy() {
        let mut view = QueueView::new();
        let mut priority = paid(RequestStatus::Pending);
        priority.priority = true;
        priority.created_at = at(0);
        let mut plain_old = paid(RequestStatus::Pending);
        plain_old.created_at = at(-600);
        let mut plain_new = paid(RequestStatus::Pending);
        plain_new.created_at = at(0);

        view.seed(
            vec![plain_new.clone(), priority.clone(), plain_old.clone()],
            at(10),
        );
        let rendered = view.render(at(10));
        assert_eq!(rendered[0].request_id, priority.id);
        assert_eq!(rendered[1].request_id, plain_old.id);
        assert_eq!(rendered[2].request_id, plain_new.id);
    }

    #[test]
    fn scripted_event_sequence_reaches_expected_state() {
        let mut view = QueueView::new();
        let a = paid(RequestStatus::Pending);
        let b = paid(RequestStatus::InReview);
        view.seed(vec![a.clone(), b.clone()], at(0));

        let mut a_updated = a.clone();
        a_updated.status = RequestStatus::InReview;
        let c = paid(RequestStatus::Pending);
        let mut b_declined = b.clone();
        b_declined.status = RequestStatus::Declined;

        view.apply(&ChangeEvent::Updated(a_updated), at(1));
        view.apply(&ChangeEvent::Inserted(c.clone()), at(2));
        view.apply(&ChangeEvent::Updated(b_declined), at(3));
        view.apply(&ChangeEvent::Deleted(c.id), at(4));

        assert_eq!(view.len(), 1);
        assert!(view.contains(a.id));
    }

    mod session {
        use super::*;
        use crate::repositories::MockRequestRepositoryTrait;

        fn lazy_pool() -> DbPool {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .connect_lazy("postgres://localhost/clinflow_test")
                .expect("lazy pool");
            Arc::new(pool)
        }

        #[tokio::test]
        async fn session_seeds_then_streams_updates() {
            let seeded = paid(RequestStatus::Pending);
            let seeded_clone = seeded.clone();
            let mut repo = MockRequestRepositoryTrait::new();
            repo.expect_list_review_queue()
                .returning(move |_| Ok(vec![seeded_clone.clone()]));

            let feed = ChangeFeed::new(16);
            let session = QueueSession::new(lazy_pool(), Arc::new(repo), feed.clone());
            let (tx, mut rx) = mpsc::channel(8);
            let handle = tokio::spawn(session.run(tx));

            let first = rx.recv().await.expect("seed snapshot");
            assert_eq!(first.items.len(), 1);
            assert!(!first.stale);

            let mut updated = seeded.clone();
            updated.status = RequestStatus::Declined;
            feed.publish(ChangeEvent::Updated(updated));

            let second = rx.recv().await.expect("update snapshot");
            assert!(second.items.is_empty());

            drop(rx);
            // Another event lets the task notice the closed consumer.
            feed.publish(ChangeEvent::Deleted(RequestId::new()));
            handle.await.expect("session task ended cleanly");
        }

        #[tokio::test]
        async fn session_reseeds_after_insert_event() {
            let inserted = paid(RequestStatus::Pending);
            let inserted_clone = inserted.clone();
            let mut reseeded = inserted.clone();
            reseeded.sla_deadline = Some(Utc::now() + Duration::hours(2));
            let reseeded_clone = reseeded.clone();

            let mut calls = 0;
            let mut repo = MockRequestRepositoryTrait::new();
            repo.expect_list_review_queue().returning(move |_| {
                calls += 1;
                if calls == 1 {
                    Ok(vec![])
                } else {
                    // Re-fetch carries computed fields the insert event lacked.
                    Ok(vec![reseeded_clone.clone()])
                }
            });

            let feed = ChangeFeed::new(16);
            let session = QueueSession::new(lazy_pool(), Arc::new(repo), feed.clone());
            let (tx, mut rx) = mpsc::channel(8);
            let handle = tokio::spawn(session.run(tx));

            let first = rx.recv().await.expect("seed snapshot");
            assert!(first.items.is_empty());

            feed.publish(ChangeEvent::Inserted(inserted_clone));
            let second = rx.recv().await.expect("post-insert snapshot");
            assert_eq!(second.items.len(), 1);
            assert!(second.items[0].sla_deadline.is_some());

            drop(rx);
            feed.publish(ChangeEvent::Deleted(RequestId::new()));
            handle.await.expect("session task ended cleanly");
        }
    }
}
