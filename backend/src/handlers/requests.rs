use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::change_feed::ChangeEvent;
use crate::error::AppError;
use crate::models::audit_event::AuditEventResponse;
use crate::models::request::{
    CreateRequestPayload, DeclineData, PaymentStatus, Request, RequestResponse, RequestStatus,
};
use crate::services::refund::RefundOutcome;
use crate::state::AppState;
use crate::types::{DoctorId, RequestId};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeStatusPayload {
    pub new_status: RequestStatus,
    pub actor_id: DoctorId,
    pub decline: Option<DeclineData>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChangeStatusResponse {
    pub request: RequestResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundOutcome>,
}

/// Intake: creates a pending, unpaid request. The SLA deadline is stamped
/// here from category policy so every later consumer sees the same value.
pub async fn create_request(
    State(state): State<AppState>,
    Json(payload): Json<CreateRequestPayload>,
) -> Result<Json<RequestResponse>, AppError> {
    payload.validate()?;

    let mut request = Request::new(payload.category, payload.subtype, payload.patient_email);
    request.sla_deadline =
        Some(request.created_at + Duration::minutes(state.config.sla_minutes_for(request.category)));

    let created = state.requests.create(&state.pool, &request).await?;
    state.feed.publish(ChangeEvent::Inserted(created.clone()));
    Ok(Json(created.into()))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<RequestId>,
) -> Result<Json<RequestResponse>, AppError> {
    let request = state
        .requests
        .find_by_id(&state.pool, request_id)
        .await?
        .ok_or_else(|| AppError::NotFound("request not found".to_string()))?;
    Ok(Json(request.into()))
}

pub async fn change_status(
    State(state): State<AppState>,
    Path(request_id): Path<RequestId>,
    Json(payload): Json<ChangeStatusPayload>,
) -> Result<Json<ChangeStatusResponse>, AppError> {
    let outcome = state
        .orchestrator
        .change_status(request_id, payload.new_status, payload.actor_id, payload.decline)
        .await?;
    Ok(Json(ChangeStatusResponse {
        request: outcome.request.into(),
        refund: outcome.refund,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClaimBatchPayload {
    pub request_ids: Vec<RequestId>,
    pub actor_id: DoctorId,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimItemResult {
    pub request_id: RequestId,
    pub claimed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimBatchResponse {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<ClaimItemResult>,
}

/// Claims each selected request independently. N-of-M success is a normal
/// outcome; the response reports every item.
pub async fn claim_batch(
    State(state): State<AppState>,
    Json(payload): Json<ClaimBatchPayload>,
) -> Result<Json<ClaimBatchResponse>, AppError> {
    if payload.request_ids.is_empty() {
        return Err(AppError::BadRequest("request_ids must not be empty".to_string()));
    }

    let results = state
        .orchestrator
        .claim_batch(payload.request_ids, payload.actor_id)
        .await;

    let mut succeeded = 0;
    let mut failed = 0;
    let results = results
        .into_iter()
        .map(|(request_id, result)| match result {
            Ok(outcome) => {
                succeeded += 1;
                ClaimItemResult {
                    request_id,
                    claimed: true,
                    request: Some(outcome.request.into()),
                    error_code: None,
                    error_message: None,
                }
            }
            Err(err) => {
                failed += 1;
                let (code, message) = claim_error_parts(err);
                ClaimItemResult {
                    request_id,
                    claimed: false,
                    request: None,
                    error_code: Some(code),
                    error_message: Some(message),
                }
            }
        })
        .collect();

    Ok(Json(ClaimBatchResponse {
        succeeded,
        failed,
        results,
    }))
}

fn claim_error_parts(err: AppError) -> (String, String) {
    match err {
        AppError::Conflict { code, message } => (code, message),
        AppError::NotFound(message) => ("NOT_FOUND".to_string(), message),
        AppError::Unauthorized(message) => ("UNAUTHORIZED".to_string(), message),
        AppError::BadRequest(message) => ("BAD_REQUEST".to_string(), message),
        AppError::Validation(errors) => ("VALIDATION_ERROR".to_string(), errors.join("; ")),
        AppError::InternalServerError(err) => {
            tracing::error!("claim failed with store error: {:?}", err);
            ("INTERNAL_SERVER_ERROR".to_string(), "internal error".to_string())
        }
    }
}

pub async fn get_audit_history(
    State(state): State<AppState>,
    Path(request_id): Path<RequestId>,
) -> Result<Json<Vec<AuditEventResponse>>, AppError> {
    let events = state.orchestrator.history(request_id).await?;
    Ok(Json(events.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentUpdatePayload {
    pub payment_status: PaymentStatus,
}

/// Boundary glue for the external payment collaborator: records a payment
/// state change and pushes the row through the change feed so queues pick
/// the request up the moment it becomes paid.
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(request_id): Path<RequestId>,
    Json(payload): Json<PaymentUpdatePayload>,
) -> Result<Json<RequestResponse>, AppError> {
    let updated = state
        .requests
        .set_payment_status(&state.pool, request_id, payload.payment_status)
        .await?;
    if updated == 0 {
        return Err(AppError::NotFound("request not found".to_string()));
    }

    let request = state
        .requests
        .find_by_id(&state.pool, request_id)
        .await?
        .ok_or_else(|| AppError::NotFound("request not found".to_string()))?;
    state.feed.publish(ChangeEvent::Updated(request.clone()));
    Ok(Json(request.into()))
}
