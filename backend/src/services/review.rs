//! Review orchestrator: the only path through which a request's status
//! changes.
//!
//! Each call is one logical read-check-write-audit sequence scoped to a
//! single request. Concurrent calls on the same request are serialized by
//! the store's conditional update; the loser re-validates against the
//! winner's state and receives a structured rejection, never a silent
//! overwrite.

use chrono::Utc;
use std::sync::Arc;

use crate::db::change_feed::{ChangeEvent, ChangeFeed};
use crate::db::connection::DbPool;
use crate::error::{AppError, ReviewError};
use crate::lifecycle::validate_transition;
use crate::models::audit_event::{ActorType, AuditEvent};
use crate::models::doctor::Doctor;
use crate::models::request::{DeclineData, PaymentStatus, Request, RequestStatus};
use crate::repositories::{DoctorDirectoryTrait, RequestRepositoryTrait, TransitionPatch};
use crate::services::audit_log::AuditLogTrait;
use crate::services::notify::{spawn_notification, StatusChangeNotice, StatusNotifier};
use crate::services::refund::{RefundOutcome, RefundPolicyEngine, RefundStatus};
use crate::types::{DoctorId, RequestId};
use crate::validation::rules;

/// Bounded retries for the validate/apply race window. Each retry reloads
/// and re-validates, so a loop only continues while the transition is still
/// legal against fresh state.
const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// Result of a successful status change, including the best-effort refund
/// outcome when the change was a decline.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub request: Request,
    pub refund: Option<RefundOutcome>,
}

#[derive(Clone)]
pub struct ReviewOrchestrator {
    pool: DbPool,
    requests: Arc<dyn RequestRepositoryTrait>,
    doctors: Arc<dyn DoctorDirectoryTrait>,
    audit: Arc<dyn AuditLogTrait>,
    refunds: RefundPolicyEngine,
    notifier: Arc<dyn StatusNotifier>,
    feed: ChangeFeed,
}

impl ReviewOrchestrator {
    pub fn new(
        pool: DbPool,
        requests: Arc<dyn RequestRepositoryTrait>,
        doctors: Arc<dyn DoctorDirectoryTrait>,
        audit: Arc<dyn AuditLogTrait>,
        refunds: RefundPolicyEngine,
        notifier: Arc<dyn StatusNotifier>,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            pool,
            requests,
            doctors,
            audit,
            refunds,
            notifier,
            feed,
        }
    }

    /// Moves a request to `new_status` on behalf of a doctor.
    ///
    /// Lifecycle rejections come back as `AppError::Conflict` carrying the
    /// validator's code and are recorded as rejected audit events. Store
    /// failures surface as internal errors; the caller owns retry policy.
    pub async fn change_status(
        &self,
        request_id: RequestId,
        new_status: RequestStatus,
        actor_id: DoctorId,
        decline: Option<DeclineData>,
    ) -> Result<ReviewOutcome, AppError> {
        let decline = validate_decline_payload(new_status, decline)?;
        let doctor = self.resolve_actor(actor_id).await?;

        let mut attempts = 0;
        let (applied, from_status) = loop {
            attempts += 1;
            let current = self
                .requests
                .find_by_id(&self.pool, request_id)
                .await?
                .ok_or_else(|| AppError::from(ReviewError::NotFound))?;

            if let Err(rejection) = validate_transition(
                current.category,
                current.status,
                new_status,
                current.payment_status,
            ) {
                self.record_rejection(&current, new_status, actor_id, &rejection.code.to_string())
                    .await?;
                return Err(ReviewError::Transition(rejection).into());
            }

            let patch = build_patch(new_status, &doctor, decline.as_ref());
            let audit = AuditEvent::success(
                request_id,
                current.status,
                new_status,
                Some(doctor.id),
                ActorType::Doctor,
            );

            match self
                .requests
                .apply_transition(&self.pool, request_id, &patch, current.status, &audit)
                .await?
            {
                Some(updated) => break (updated, current.status),
                // A concurrent writer moved the row between our read and the
                // guarded update. Reload and re-validate from scratch.
                None if attempts < MAX_TRANSITION_ATTEMPTS => continue,
                None => {
                    return Err(AppError::Conflict {
                        code: "INVALID_TRANSITION".to_string(),
                        message: "request state changed concurrently; please retry".to_string(),
                    })
                }
            }
        };

        tracing::info!(
            request_id = %request_id,
            from = from_status.as_str(),
            to = new_status.as_str(),
            actor_id = %actor_id,
            "request transition applied"
        );
        self.feed.publish(ChangeEvent::Updated(applied.clone()));

        let refund = if matches!(new_status, RequestStatus::Declined) {
            Some(self.settle_refund(&applied, actor_id).await)
        } else {
            None
        };

        // Reflect any refund write in the returned row without re-reading.
        let mut result = applied;
        if let Some(outcome) = &refund {
            match outcome.refund_status {
                RefundStatus::Refunded => result.payment_status = PaymentStatus::Refunded,
                RefundStatus::Failed => result.payment_status = PaymentStatus::RefundFailed,
                RefundStatus::NotEligible => {}
            }
        }

        spawn_notification(
            self.notifier.clone(),
            StatusChangeNotice {
                request_id,
                new_status,
                patient_email: result.patient_email.clone(),
                actor_name: doctor.display_name.clone(),
                decline_reason_note: result.decline_reason_note.clone(),
            },
        );

        Ok(ReviewOutcome {
            request: result,
            refund,
        })
    }

    /// Claims each selected request independently; partial success is a
    /// normal, reported outcome rather than a batch failure.
    pub async fn claim_batch(
        &self,
        request_ids: Vec<RequestId>,
        actor_id: DoctorId,
    ) -> Vec<(RequestId, Result<ReviewOutcome, AppError>)> {
        let mut results = Vec::with_capacity(request_ids.len());
        for request_id in request_ids {
            let result = self
                .change_status(request_id, RequestStatus::InReview, actor_id, None)
                .await;
            results.push((request_id, result));
        }
        results
    }

    pub async fn history(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<AuditEvent>, AppError> {
        let events = self
            .audit
            .history(&self.pool, request_id)
            .await
            .map_err(|err| AppError::InternalServerError(err.into()))?;
        Ok(events)
    }

    async fn resolve_actor(&self, actor_id: DoctorId) -> Result<Doctor, AppError> {
        let doctor = self
            .doctors
            .find_by_id(&self.pool, actor_id)
            .await?
            .filter(|doctor| doctor.active)
            .ok_or_else(|| AppError::from(ReviewError::Unauthorized))?;
        Ok(doctor)
    }

    async fn record_rejection(
        &self,
        current: &Request,
        requested: RequestStatus,
        actor_id: DoctorId,
        code: &str,
    ) -> Result<(), AppError> {
        let event = AuditEvent::rejected(
            current.id,
            current.status,
            requested,
            Some(actor_id),
            ActorType::Doctor,
            code,
        );
        self.audit
            .record(&self.pool, &event)
            .await
            .map_err(|err| AppError::InternalServerError(err.into()))
    }

    /// Runs after the decline has committed. Whatever happens here, the
    /// decline stands; refund state is persisted best-effort and the outcome
    /// is reported to the caller for manual follow-up when needed.
    async fn settle_refund(&self, declined: &Request, actor_id: DoctorId) -> RefundOutcome {
        let outcome = self.refunds.evaluate_refund(declined, actor_id).await;

        let new_payment_status = match outcome.refund_status {
            RefundStatus::Refunded => Some(PaymentStatus::Refunded),
            RefundStatus::Failed => Some(PaymentStatus::RefundFailed),
            RefundStatus::NotEligible => None,
        };
        if let Some(payment_status) = new_payment_status {
            match self
                .requests
                .set_payment_status(&self.pool, declined.id, payment_status)
                .await
            {
                Ok(_) => {
                    let mut updated = declined.clone();
                    updated.payment_status = payment_status;
                    self.feed.publish(ChangeEvent::Updated(updated));
                }
                Err(err) => {
                    tracing::error!(
                        request_id = %declined.id,
                        error = ?err,
                        "failed to persist refund outcome; payment state needs reconciliation"
                    );
                }
            }
        }
        outcome
    }
}

fn validate_decline_payload(
    new_status: RequestStatus,
    decline: Option<DeclineData>,
) -> Result<Option<DeclineData>, AppError> {
    match (new_status, decline) {
        (RequestStatus::Declined, None) => Err(AppError::Validation(vec![
            "decline: reason_code is required when declining".to_string(),
        ])),
        (RequestStatus::Declined, Some(decline)) => {
            let mut errors = Vec::new();
            if let Err(err) = rules::validate_reason_code(&decline.reason_code) {
                errors.push(format!("reason_code: {}", err.code));
            }
            if let Some(note) = decline.reason_note.as_deref() {
                if let Err(err) = rules::validate_decline_note(note) {
                    errors.push(format!("reason_note: {}", err.code));
                }
            }
            if errors.is_empty() {
                Ok(Some(decline))
            } else {
                Err(AppError::Validation(errors))
            }
        }
        (_, Some(_)) => Err(AppError::BadRequest(
            "decline data is only accepted when declining".to_string(),
        )),
        (_, None) => Ok(None),
    }
}

fn build_patch(
    new_status: RequestStatus,
    doctor: &Doctor,
    decline: Option<&DeclineData>,
) -> TransitionPatch {
    TransitionPatch {
        new_status,
        reviewed_by: Some(doctor.id),
        reviewed_at: Some(Utc::now()),
        decline_reason_code: decline.map(|d| d.reason_code.clone()),
        decline_reason_note: decline.and_then(|d| d.reason_note.clone()),
    }
}
