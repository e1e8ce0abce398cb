//! Append-only audit event storage.
//!
//! Inserts and ordered reads only; no update or delete exists here by
//! contract. `insert_audit_event` is generic over the executor so the
//! request repository can run it inside its transition transaction.

use sqlx::{PgPool, Postgres};

use crate::models::audit_event::AuditEvent;
use crate::types::RequestId;

const AUDIT_COLUMNS: &str = "id, request_id, from_state, to_state, actor_id, actor_type, \
     outcome, rejection_code, idempotency_key, occurred_at";

/// Inserts one audit row. When an idempotency key is present, a duplicate
/// submission is a no-op rather than an error.
pub async fn insert_audit_event<'e, E>(executor: E, event: &AuditEvent) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let query = format!(
        "INSERT INTO audit_events ({}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (idempotency_key) WHERE idempotency_key IS NOT NULL DO NOTHING",
        AUDIT_COLUMNS
    );
    sqlx::query(&query)
        .bind(event.id)
        .bind(event.request_id)
        .bind(event.from_state)
        .bind(event.to_state)
        .bind(event.actor_id)
        .bind(event.actor_type)
        .bind(event.outcome)
        .bind(&event.rejection_code)
        .bind(&event.idempotency_key)
        .bind(event.occurred_at)
        .execute(executor)
        .await
        .map(|_| ())
}

/// Full transition history of one request, oldest first. Ties on timestamp
/// break on id so the order is stable.
pub async fn list_audit_events_for_request(
    pool: &PgPool,
    request_id: RequestId,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM audit_events WHERE request_id = $1 ORDER BY occurred_at ASC, id ASC",
        AUDIT_COLUMNS
    );
    sqlx::query_as::<_, AuditEvent>(&query)
        .bind(request_id)
        .fetch_all(pool)
        .await
}
