use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::types::{DoctorId, RequestId};

/// Workflow state of a clinical request.
///
/// `Approved` and `Declined` are terminal; everything else is "active" and
/// eligible to appear in the review queue while the request is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InReview,
    PendingInfo,
    AwaitingPrescribe,
    NeedsFollowUp,
    Approved,
    Declined,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Declined)
    }

    /// Statuses visible in the doctor-facing review queue.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Stable database/wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InReview => "in_review",
            RequestStatus::PendingInfo => "pending_info",
            RequestStatus::AwaitingPrescribe => "awaiting_prescribe",
            RequestStatus::NeedsFollowUp => "needs_follow_up",
            RequestStatus::Approved => "approved",
            RequestStatus::Declined => "declined",
        }
    }
}

impl Default for RequestStatus {
    fn default() -> Self {
        RequestStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    PendingPayment,
    Paid,
    Refunded,
    RefundFailed,
}

impl PaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

/// Clinical request category. Immutable after creation; prescriptions take
/// the extra `awaiting_prescribe` step before approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestCategory {
    Prescription,
    MedicalCertificate,
    ConsultNote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Request {
    pub id: RequestId,
    pub status: RequestStatus,
    pub payment_status: PaymentStatus,
    pub category: RequestCategory,
    pub subtype: Option<String>,
    pub patient_email: Option<String>,
    pub reviewed_by: Option<DoctorId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub decline_reason_code: Option<String>,
    pub decline_reason_note: Option<String>,
    pub sla_deadline: Option<DateTime<Utc>>,
    pub flagged_for_followup: bool,
    pub priority: bool,
    pub risk_tier: Option<RiskTier>,
    pub risk_score: Option<f64>,
    pub document_issued_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    pub fn new(category: RequestCategory, subtype: Option<String>, patient_email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RequestId::new(),
            status: RequestStatus::Pending,
            payment_status: PaymentStatus::PendingPayment,
            category,
            subtype,
            patient_email,
            reviewed_by: None,
            reviewed_at: None,
            decline_reason_code: None,
            decline_reason_note: None,
            sla_deadline: None,
            flagged_for_followup: false,
            priority: false,
            risk_tier: None,
            risk_score: None,
            document_issued_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A request is visible to reviewing doctors only while paid and active.
    pub fn is_queue_visible(&self) -> bool {
        self.status.is_active() && self.payment_status.is_paid()
    }
}

/// Decline details supplied by the reviewing doctor.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DeclineData {
    #[validate(length(min = 1, max = 64))]
    pub reason_code: String,
    #[validate(length(max = 2000))]
    pub reason_note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRequestPayload {
    pub category: RequestCategory,
    #[validate(length(max = 128))]
    pub subtype: Option<String>,
    #[validate(email)]
    pub patient_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestResponse {
    pub id: RequestId,
    pub status: RequestStatus,
    pub payment_status: PaymentStatus,
    pub category: RequestCategory,
    pub subtype: Option<String>,
    pub reviewed_by: Option<DoctorId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub decline_reason_code: Option<String>,
    pub decline_reason_note: Option<String>,
    pub sla_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Request> for RequestResponse {
    fn from(request: Request) -> Self {
        RequestResponse {
            id: request.id,
            status: request.status,
            payment_status: request.payment_status,
            category: request.category,
            subtype: request.subtype,
            reviewed_by: request.reviewed_by,
            reviewed_at: request.reviewed_at,
            decline_reason_code: request.decline_reason_code,
            decline_reason_note: request.decline_reason_note,
            sla_deadline: request.sla_deadline,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}
