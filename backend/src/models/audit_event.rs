use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::request::RequestStatus;
use crate::types::{AuditEventId, DoctorId, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    Doctor,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Rejected,
}

/// One row per transition attempt, successful or not. Append-only: no code
/// path updates or deletes these rows once written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub request_id: RequestId,
    pub from_state: RequestStatus,
    pub to_state: RequestStatus,
    pub actor_id: Option<DoctorId>,
    pub actor_type: ActorType,
    pub outcome: AuditOutcome,
    pub rejection_code: Option<String>,
    pub idempotency_key: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn success(
        request_id: RequestId,
        from_state: RequestStatus,
        to_state: RequestStatus,
        actor_id: Option<DoctorId>,
        actor_type: ActorType,
    ) -> Self {
        Self {
            id: AuditEventId::new(),
            request_id,
            from_state,
            to_state,
            actor_id,
            actor_type,
            outcome: AuditOutcome::Success,
            rejection_code: None,
            idempotency_key: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn rejected(
        request_id: RequestId,
        from_state: RequestStatus,
        to_state: RequestStatus,
        actor_id: Option<DoctorId>,
        actor_type: ActorType,
        rejection_code: impl Into<String>,
    ) -> Self {
        Self {
            id: AuditEventId::new(),
            request_id,
            from_state,
            to_state,
            actor_id,
            actor_type,
            outcome: AuditOutcome::Rejected,
            rejection_code: Some(rejection_code.into()),
            idempotency_key: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditEventResponse {
    pub id: AuditEventId,
    pub request_id: RequestId,
    pub from_state: RequestStatus,
    pub to_state: RequestStatus,
    pub actor_id: Option<DoctorId>,
    pub actor_type: ActorType,
    pub outcome: AuditOutcome,
    pub rejection_code: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl From<AuditEvent> for AuditEventResponse {
    fn from(event: AuditEvent) -> Self {
        AuditEventResponse {
            id: event.id,
            request_id: event.request_id,
            from_state: event.from_state,
            to_state: event.to_state,
            actor_id: event.actor_id,
            actor_type: event.actor_type,
            outcome: event.outcome,
            rejection_code: event.rejection_code,
            occurred_at: event.occurred_at,
        }
    }
}
