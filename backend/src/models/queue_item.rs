use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::request::{Request, RequestCategory, RequestStatus, RiskTier};
use crate::sla::Severity;
use crate::types::RequestId;

/// Doctor-facing projection of a request while it sits in the review queue.
/// Materialized per session from the change feed; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueueItem {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub category: RequestCategory,
    pub subtype: Option<String>,
    pub severity: Severity,
    pub sla_deadline: Option<DateTime<Utc>>,
    pub flagged_for_followup: bool,
    pub priority: bool,
    pub risk_tier: Option<RiskTier>,
    pub risk_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl QueueItem {
    /// Projects a request at a given instant. Severity is a function of
    /// "now", so callers pass the clock in rather than reading it here.
    pub fn project(request: &Request, now: DateTime<Utc>) -> Self {
        Self {
            request_id: request.id,
            status: request.status,
            category: request.category,
            subtype: request.subtype.clone(),
            severity: Severity::of(now, request.created_at, request.sla_deadline),
            sla_deadline: request.sla_deadline,
            flagged_for_followup: request.flagged_for_followup,
            priority: request.priority,
            risk_tier: request.risk_tier,
            risk_score: request.risk_score,
            created_at: request.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::PaymentStatus;

    #[test]
    fn projection_carries_queue_ordering_fields() {
        let mut request = Request::new(RequestCategory::Prescription, None, None);
        request.payment_status = PaymentStatus::Paid;
        request.priority = true;
        request.flagged_for_followup = true;
        let item = QueueItem::project(&request, Utc::now());
        assert_eq!(item.request_id, request.id);
        assert!(item.priority);
        assert!(item.flagged_for_followup);
        assert!(matches!(item.severity, Severity::Normal));
    }
}
