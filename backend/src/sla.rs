//! SLA deadline tiers and review-queue ordering.
//!
//! Severity is display/sorting metadata only; it never feeds into transition
//! legality. Both functions are pure so they can be exercised with fixed
//! clocks in tests.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use utoipa::ToSchema;

use crate::models::queue_item::QueueItem;

/// How long an undeadlined request may wait before escalating, in minutes.
const NO_DEADLINE_WARNING_MIN: i64 = 30;
const NO_DEADLINE_CRITICAL_MIN: i64 = 60;
/// Window before an explicit deadline in which a request turns to warning.
const DEADLINE_WARNING_WINDOW_MIN: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl Severity {
    /// Tier for a request created at `created_at` with an optional deadline,
    /// evaluated at `now`. Monotone in `now` for a fixed deadline.
    pub fn of(
        now: DateTime<Utc>,
        created_at: DateTime<Utc>,
        sla_deadline: Option<DateTime<Utc>>,
    ) -> Self {
        match sla_deadline {
            Some(deadline) => {
                if now > deadline {
                    Severity::Critical
                } else if now >= deadline - Duration::minutes(DEADLINE_WARNING_WINDOW_MIN) {
                    Severity::Warning
                } else {
                    Severity::Normal
                }
            }
            None => {
                let waited = now - created_at;
                if waited > Duration::minutes(NO_DEADLINE_CRITICAL_MIN) {
                    Severity::Critical
                } else if waited > Duration::minutes(NO_DEADLINE_WARNING_MIN) {
                    Severity::Warning
                } else {
                    Severity::Normal
                }
            }
        }
    }
}

/// Total order for the review queue: priority first, then clinical follow-up
/// flag, then severity (critical first), then earliest deadline (requests
/// without a deadline sort after those with one), then earliest creation.
/// Request id is the final tiebreaker so the order is fully deterministic.
pub fn queue_ordering(a: &QueueItem, b: &QueueItem) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then(b.flagged_for_followup.cmp(&a.flagged_for_followup))
        .then(b.severity.cmp(&a.severity))
        .then(compare_deadlines(a.sla_deadline, b.sla_deadline))
        .then(a.created_at.cmp(&b.created_at))
        .then(a.request_id.cmp(&b.request_id))
}

fn compare_deadlines(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
