//! Refund eligibility on decline.
//!
//! A decline is the primary clinical action; refunds ride behind it and are
//! strictly best-effort. Every "can't refund" business outcome is an Ok
//! value here: gateway trouble becomes `RefundStatus::Failed`, which the
//! caller exposes as a retryable manual-intervention case.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::request::{PaymentStatus, Request};
use crate::types::{DoctorId, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Refunded,
    NotEligible,
    Failed,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RefundOutcome {
    pub refunded: bool,
    pub refund_status: RefundStatus,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub amount_cents: i64,
}

#[derive(Debug, Error)]
pub enum RefundGatewayError {
    #[error("refund rejected by payment provider: {0}")]
    Rejected(String),
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
}

/// External payment collaborator boundary. Only refunds are consumed here;
/// capture happens elsewhere entirely.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn refund(&self, request_id: RequestId) -> Result<RefundReceipt, RefundGatewayError>;
}

#[derive(Clone)]
pub struct RefundPolicyEngine {
    gateway: Arc<dyn PaymentGateway>,
}

impl RefundPolicyEngine {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    /// Computes refund eligibility for a just-declined request and, when
    /// eligible, asks the gateway to execute it.
    ///
    /// Eligibility: the patient paid and no clinical document was issued
    /// before the decline.
    pub async fn evaluate_refund(&self, request: &Request, actor_id: DoctorId) -> RefundOutcome {
        if !matches!(request.payment_status, PaymentStatus::Paid) {
            return RefundOutcome {
                refunded: false,
                refund_status: RefundStatus::NotEligible,
                reason: "no completed payment to refund".to_string(),
                amount_cents: None,
            };
        }

        if request.document_issued_at.is_some() {
            return RefundOutcome {
                refunded: false,
                refund_status: RefundStatus::NotEligible,
                reason: "a clinical document was already issued for this request".to_string(),
                amount_cents: None,
            };
        }

        match self.gateway.refund(request.id).await {
            Ok(receipt) => {
                tracing::info!(
                    request_id = %request.id,
                    actor_id = %actor_id,
                    amount_cents = receipt.amount_cents,
                    "refund issued on decline"
                );
                RefundOutcome {
                    refunded: true,
                    refund_status: RefundStatus::Refunded,
                    reason: "declined before document issuance".to_string(),
                    amount_cents: Some(receipt.amount_cents),
                }
            }
            Err(err) => {
                tracing::warn!(
                    request_id = %request.id,
                    actor_id = %actor_id,
                    error = %err,
                    "refund attempt failed; flagged for manual retry"
                );
                RefundOutcome {
                    refunded: false,
                    refund_status: RefundStatus::Failed,
                    reason: err.to_string(),
                    amount_cents: None,
                }
            }
        }
    }
}
