//! Request repository trait for dependency injection and testing.
//!
//! The store contract the lifecycle engine relies on: point reads, queue
//! listing, and a conditional transition write that only applies while the
//! row still holds the status the caller validated against. Use
//! `MockRequestRepositoryTrait` in tests to script store behavior.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::audit_event::AuditEvent;
use crate::models::request::{PaymentStatus, Request, RequestStatus};
use crate::types::{DoctorId, RequestId};

const REQUEST_COLUMNS: &str = "id, status, payment_status, category, subtype, patient_email, \
     reviewed_by, reviewed_at, decline_reason_code, decline_reason_note, \
     sla_deadline, flagged_for_followup, priority, risk_tier, risk_score, document_issued_at, \
     created_at, updated_at";

/// Fields written alongside a status change. Everything not listed here is
/// immutable during a transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionPatch {
    pub new_status: RequestStatus,
    pub reviewed_by: Option<DoctorId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub decline_reason_code: Option<String>,
    pub decline_reason_note: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestRepositoryTrait: Send + Sync {
    /// Find a request by ID.
    async fn find_by_id(&self, db: &PgPool, id: RequestId) -> Result<Option<Request>, AppError>;

    /// Create a new request.
    async fn create(&self, db: &PgPool, item: &Request) -> Result<Request, AppError>;

    /// All paid requests in an active status, oldest first. This is the seed
    /// for a doctor's queue view.
    async fn list_review_queue(&self, db: &PgPool) -> Result<Vec<Request>, AppError>;

    /// Applies a validated transition with optimistic concurrency: the UPDATE
    /// is guarded on `expected_current_status` and the success audit event is
    /// inserted in the same transaction. Returns the updated row, or `None`
    /// when a concurrent writer changed the status first (nothing is written
    /// in that case).
    async fn apply_transition(
        &self,
        db: &PgPool,
        id: RequestId,
        patch: &TransitionPatch,
        expected_current_status: RequestStatus,
        audit: &AuditEvent,
    ) -> Result<Option<Request>, AppError>;

    /// Updates payment state (refund outcomes; payment capture lives in the
    /// external collaborator).
    async fn set_payment_status(
        &self,
        db: &PgPool,
        id: RequestId,
        payment_status: PaymentStatus,
    ) -> Result<u64, AppError>;
}

/// Concrete PostgreSQL implementation of RequestRepositoryTrait.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestRepository;

impl RequestRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RequestRepositoryTrait for RequestRepository {
    async fn find_by_id(&self, db: &PgPool, id: RequestId) -> Result<Option<Request>, AppError> {
        let query = format!("SELECT {} FROM requests WHERE id = $1", REQUEST_COLUMNS);
        let row = sqlx::query_as::<_, Request>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    async fn create(&self, db: &PgPool, item: &Request) -> Result<Request, AppError> {
        let query = format!(
            "INSERT INTO requests ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING {}",
            REQUEST_COLUMNS, REQUEST_COLUMNS
        );
        let row = sqlx::query_as::<_, Request>(&query)
            .bind(item.id)
            .bind(item.status)
            .bind(item.payment_status)
            .bind(item.category)
            .bind(&item.subtype)
            .bind(&item.patient_email)
            .bind(item.reviewed_by)
            .bind(item.reviewed_at)
            .bind(&item.decline_reason_code)
            .bind(&item.decline_reason_note)
            .bind(item.sla_deadline)
            .bind(item.flagged_for_followup)
            .bind(item.priority)
            .bind(item.risk_tier)
            .bind(item.risk_score)
            .bind(item.document_issued_at)
            .bind(item.created_at)
            .bind(item.updated_at)
            .fetch_one(db)
            .await?;
        Ok(row)
    }

    async fn list_review_queue(&self, db: &PgPool) -> Result<Vec<Request>, AppError> {
        let query = format!(
            "SELECT {} FROM requests \
             WHERE payment_status = 'paid' \
             AND status IN ('pending', 'in_review', 'pending_info', 'awaiting_prescribe', 'needs_follow_up') \
             ORDER BY created_at ASC",
            REQUEST_COLUMNS
        );
        let rows = sqlx::query_as::<_, Request>(&query).fetch_all(db).await?;
        Ok(rows)
    }

    async fn apply_transition(
        &self,
        db: &PgPool,
        id: RequestId,
        patch: &TransitionPatch,
        expected_current_status: RequestStatus,
        audit: &AuditEvent,
    ) -> Result<Option<Request>, AppError> {
        let mut tx = db.begin().await?;

        let query = format!(
            "UPDATE requests SET status = $1, \
             reviewed_by = COALESCE($2, reviewed_by), \
             reviewed_at = COALESCE($3, reviewed_at), \
             decline_reason_code = COALESCE($4, decline_reason_code), \
             decline_reason_note = COALESCE($5, decline_reason_note), \
             updated_at = $6 \
             WHERE id = $7 AND status = $8 \
             RETURNING {}",
            REQUEST_COLUMNS
        );
        let updated = sqlx::query_as::<_, Request>(&query)
            .bind(patch.new_status)
            .bind(patch.reviewed_by)
            .bind(patch.reviewed_at)
            .bind(&patch.decline_reason_code)
            .bind(&patch.decline_reason_note)
            .bind(Utc::now())
            .bind(id)
            .bind(expected_current_status)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(updated) = updated else {
            // Lost the race: leave no trace, the orchestrator re-validates
            // against the winner's state and records its own rejection.
            tx.rollback().await?;
            return Ok(None);
        };

        super::audit_event::insert_audit_event(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn set_payment_status(
        &self,
        db: &PgPool,
        id: RequestId,
        payment_status: PaymentStatus,
    ) -> Result<u64, AppError> {
        let result =
            sqlx::query("UPDATE requests SET payment_status = $1, updated_at = $2 WHERE id = $3")
                .bind(payment_status)
                .bind(Utc::now())
                .bind(id)
                .execute(db)
                .await?;
        Ok(result.rows_affected())
    }
}
