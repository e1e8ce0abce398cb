//! Audit log service: the only writer of audit events outside the
//! transition transaction itself.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::audit_event::AuditEvent;
use crate::repositories::audit_event as audit_event_repo;
use crate::types::RequestId;

/// Append and read back transition history. No update or delete is exposed,
/// here or anywhere else.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLogTrait: Send + Sync {
    /// Appends one event. Idempotent when the event carries an idempotency
    /// key: resubmitting the same key is a no-op.
    async fn record(&self, db: &PgPool, event: &AuditEvent) -> Result<(), sqlx::Error>;

    /// Ordered history for one request, oldest first.
    async fn history(&self, db: &PgPool, request_id: RequestId)
        -> Result<Vec<AuditEvent>, sqlx::Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AuditLogService;

impl AuditLogService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditLogTrait for AuditLogService {
    async fn record(&self, db: &PgPool, event: &AuditEvent) -> Result<(), sqlx::Error> {
        audit_event_repo::insert_audit_event(db, event).await
    }

    async fn history(
        &self,
        db: &PgPool,
        request_id: RequestId,
    ) -> Result<Vec<AuditEvent>, sqlx::Error> {
        audit_event_repo::list_audit_events_for_request(db, request_id).await
    }
}
