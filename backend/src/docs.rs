#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use utoipa::OpenApi;

use crate::handlers::requests::{
    ChangeStatusPayload, ChangeStatusResponse, ClaimBatchPayload, ClaimBatchResponse,
    ClaimItemResult, PaymentUpdatePayload,
};
use crate::models::audit_event::{ActorType, AuditEventResponse, AuditOutcome};
use crate::models::queue_item::QueueItem;
use crate::models::request::{
    CreateRequestPayload, DeclineData, PaymentStatus, RequestCategory, RequestResponse,
    RequestStatus, RiskTier,
};
use crate::services::queue_sync::QueueSnapshot;
use crate::services::refund::{RefundOutcome, RefundStatus};
use crate::sla::Severity;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clinflow review API",
        description = "Clinical request lifecycle and review queue engine"
    ),
    paths(
        create_request_doc,
        get_request_doc,
        change_status_doc,
        update_payment_doc,
        audit_history_doc,
        claim_batch_doc,
        queue_doc,
        queue_stream_doc
    ),
    components(schemas(
        RequestStatus,
        PaymentStatus,
        RequestCategory,
        RiskTier,
        Severity,
        CreateRequestPayload,
        DeclineData,
        RequestResponse,
        ChangeStatusPayload,
        ChangeStatusResponse,
        ClaimBatchPayload,
        ClaimBatchResponse,
        ClaimItemResult,
        PaymentUpdatePayload,
        ActorType,
        AuditOutcome,
        AuditEventResponse,
        QueueItem,
        QueueSnapshot,
        RefundOutcome,
        RefundStatus,
    )),
    tags(
        (name = "Requests", description = "Request intake and review actions"),
        (name = "Queue", description = "Doctor-facing review queue")
    )
)]
pub struct ApiDoc;

#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = CreateRequestPayload,
    responses(
        (status = 200, description = "Request created in pending, unpaid state", body = RequestResponse),
        (status = 400, description = "Payload failed validation")
    ),
    tag = "Requests"
)]
fn create_request_doc() {}

#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, body = RequestResponse),
        (status = 404, description = "No such request")
    ),
    tag = "Requests"
)]
fn get_request_doc() {}

#[utoipa::path(
    put,
    path = "/api/requests/{id}/status",
    params(("id" = String, Path, description = "Request id")),
    request_body = ChangeStatusPayload,
    responses(
        (status = 200, description = "Transition applied", body = ChangeStatusResponse),
        (status = 409, description = "Transition rejected with PAYMENT_REQUIRED, TERMINAL_STATE or INVALID_TRANSITION"),
        (status = 401, description = "Actor is not an active doctor"),
        (status = 404, description = "No such request")
    ),
    tag = "Requests"
)]
fn change_status_doc() {}

#[utoipa::path(
    put,
    path = "/api/requests/{id}/payment",
    params(("id" = String, Path, description = "Request id")),
    request_body = PaymentUpdatePayload,
    responses(
        (status = 200, description = "Payment state recorded", body = RequestResponse),
        (status = 404, description = "No such request")
    ),
    tag = "Requests"
)]
fn update_payment_doc() {}

#[utoipa::path(
    get,
    path = "/api/requests/{id}/audit",
    params(("id" = String, Path, description = "Request id")),
    responses((status = 200, description = "Transition history, oldest first", body = [AuditEventResponse])),
    tag = "Requests"
)]
fn audit_history_doc() {}

#[utoipa::path(
    post,
    path = "/api/requests/claim",
    request_body = ClaimBatchPayload,
    responses(
        (status = 200, description = "Per-item claim results; partial success is normal", body = ClaimBatchResponse),
        (status = 400, description = "Empty id list")
    ),
    tag = "Requests"
)]
fn claim_batch_doc() {}

#[utoipa::path(
    get,
    path = "/api/queue",
    responses((status = 200, description = "Sorted queue snapshot", body = QueueSnapshot)),
    tag = "Queue"
)]
fn queue_doc() {}

#[utoipa::path(
    get,
    path = "/api/queue/stream",
    responses((status = 200, description = "Server-sent events; each message is a full QueueSnapshot")),
    tag = "Queue"
)]
fn queue_stream_doc() {}
