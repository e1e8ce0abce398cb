//! Pure transition legality rules for the request workflow.
//!
//! Everything in this module is synchronous and side-effect free: legality is
//! a function of (category, current status, requested status, payment status)
//! and nothing else. The orchestrator owns persistence and auditing; this
//! module only answers "may this transition happen".

use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

use crate::models::request::{PaymentStatus, RequestCategory, RequestStatus};

/// Machine-readable rejection codes surfaced to callers and written into the
/// audit trail verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionErrorCode {
    PaymentRequired,
    TerminalState,
    InvalidTransition,
}

impl TransitionErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionErrorCode::PaymentRequired => "PAYMENT_REQUIRED",
            TransitionErrorCode::TerminalState => "TERMINAL_STATE",
            TransitionErrorCode::InvalidTransition => "INVALID_TRANSITION",
        }
    }
}

impl fmt::Display for TransitionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TransitionError {
    pub code: TransitionErrorCode,
    pub message: String,
}

impl TransitionError {
    fn new(code: TransitionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for TransitionError {}

/// Decides whether `current -> requested` is legal for a request in the
/// given category and payment state.
///
/// Check order is fixed: terminal lock first, then the payment gate, then
/// the adjacency table. A declined-and-refunded request therefore reports
/// `TERMINAL_STATE`, not `PAYMENT_REQUIRED`.
pub fn validate_transition(
    category: RequestCategory,
    current: RequestStatus,
    requested: RequestStatus,
    payment: PaymentStatus,
) -> Result<(), TransitionError> {
    if current.is_terminal() {
        return Err(TransitionError::new(
            TransitionErrorCode::TerminalState,
            format!("request is {} and can no longer change state", current.as_str()),
        ));
    }

    // A request must be paid before a doctor can act on it.
    if !payment.is_paid() {
        return Err(TransitionError::new(
            TransitionErrorCode::PaymentRequired,
            "payment has not completed for this request",
        ));
    }

    if is_adjacent(category, current, requested) {
        Ok(())
    } else {
        Err(TransitionError::new(
            TransitionErrorCode::InvalidTransition,
            format!(
                "transition {} -> {} is not allowed",
                current.as_str(),
                requested.as_str()
            ),
        ))
    }
}

/// The closed adjacency table. Exhaustive over source states so that adding
/// a status forces this match to be revisited.
fn is_adjacent(category: RequestCategory, current: RequestStatus, requested: RequestStatus) -> bool {
    use RequestStatus::*;

    match current {
        Pending => matches!(requested, InReview),
        InReview => match requested {
            PendingInfo | NeedsFollowUp | Declined => true,
            // Prescriptions park at awaiting_prescribe until the external
            // script-issuance step completes; other categories approve
            // straight out of review.
            AwaitingPrescribe => matches!(category, RequestCategory::Prescription),
            Approved => !matches!(category, RequestCategory::Prescription),
            Pending | InReview => false,
        },
        PendingInfo => matches!(requested, InReview),
        AwaitingPrescribe => matches!(requested, Approved | Declined),
        // Only legal exit is back into review; anything else needs product
        // sign-off before it gets an edge here.
        NeedsFollowUp => matches!(requested, InReview),
        Approved | Declined => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [RequestStatus; 7] = [
        RequestStatus::Pending,
        RequestStatus::InReview,
        RequestStatus::PendingInfo,
        RequestStatus::AwaitingPrescribe,
        RequestStatus::NeedsFollowUp,
        RequestStatus::Approved,
        RequestStatus::Declined,
    ];

    const ALL_CATEGORIES: [RequestCategory; 3] = [
        RequestCategory::Prescription,
        RequestCategory::MedicalCertificate,
        RequestCategory::ConsultNote,
    ];

    fn check(
        category: RequestCategory,
        current: RequestStatus,
        requested: RequestStatus,
    ) -> Result<(), TransitionError> {
        validate_transition(category, current, requested, PaymentStatus::Paid)
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        for category in ALL_CATEGORIES {
            for current in [RequestStatus::Approved, RequestStatus::Declined] {
                for requested in ALL_STATUSES {
                    let err = check(category, current, requested).unwrap_err();
                    assert_eq!(err.code, TransitionErrorCode::TerminalState);
                }
            }
        }
    }

    #[test]
    fn unpaid_request_rejects_any_move_out_of_pending() {
        for payment in [
            PaymentStatus::PendingPayment,
            PaymentStatus::Refunded,
            PaymentStatus::RefundFailed,
        ] {
            let err = validate_transition(
                RequestCategory::MedicalCertificate,
                RequestStatus::Pending,
                RequestStatus::InReview,
                payment,
            )
            .unwrap_err();
            assert_eq!(err.code, TransitionErrorCode::PaymentRequired);
        }
    }

    #[test]
    fn terminal_check_precedes_payment_check() {
        // A declined request whose payment was refunded must still report
        // TERMINAL_STATE, not PAYMENT_REQUIRED.
        let err = validate_transition(
            RequestCategory::Prescription,
            RequestStatus::Declined,
            RequestStatus::InReview,
            PaymentStatus::Refunded,
        )
        .unwrap_err();
        assert_eq!(err.code, TransitionErrorCode::TerminalState);
    }

    #[test]
    fn pending_only_moves_to_in_review() {
        assert!(check(
            RequestCategory::ConsultNote,
            RequestStatus::Pending,
            RequestStatus::InReview
        )
        .is_ok());
        for requested in ALL_STATUSES {
            if matches!(requested, RequestStatus::InReview) {
                continue;
            }
            let err = check(RequestCategory::ConsultNote, RequestStatus::Pending, requested)
                .unwrap_err();
            assert_eq!(err.code, TransitionErrorCode::InvalidTransition);
        }
    }

    #[test]
    fn prescription_routes_through_awaiting_prescribe() {
        // Clinically approved but script not yet issued.
        assert!(check(
            RequestCategory::Prescription,
            RequestStatus::InReview,
            RequestStatus::AwaitingPrescribe
        )
        .is_ok());
        // Direct approval from review is reserved for non-prescriptions.
        let err = check(
            RequestCategory::Prescription,
            RequestStatus::InReview,
            RequestStatus::Approved,
        )
        .unwrap_err();
        assert_eq!(err.code, TransitionErrorCode::InvalidTransition);
        assert!(check(
            RequestCategory::Prescription,
            RequestStatus::AwaitingPrescribe,
            RequestStatus::Approved
        )
        .is_ok());
    }

    #[test]
    fn certificate_approves_directly_from_review() {
        assert!(check(
            RequestCategory::MedicalCertificate,
            RequestStatus::InReview,
            RequestStatus::Approved
        )
        .is_ok());
        let err = check(
            RequestCategory::MedicalCertificate,
            RequestStatus::InReview,
            RequestStatus::AwaitingPrescribe,
        )
        .unwrap_err();
        assert_eq!(err.code, TransitionErrorCode::InvalidTransition);
    }

    #[test]
    fn pending_info_must_return_through_review() {
        assert!(check(
            RequestCategory::MedicalCertificate,
            RequestStatus::PendingInfo,
            RequestStatus::InReview
        )
        .is_ok());
        let err = check(
            RequestCategory::MedicalCertificate,
            RequestStatus::PendingInfo,
            RequestStatus::Approved,
        )
        .unwrap_err();
        assert_eq!(err.code, TransitionErrorCode::InvalidTransition);
        assert!(err.message.contains("pending_info"));
        assert!(err.message.contains("approved"));
    }

    #[test]
    fn needs_follow_up_only_exits_to_in_review() {
        for requested in ALL_STATUSES {
            let result = check(
                RequestCategory::ConsultNote,
                RequestStatus::NeedsFollowUp,
                requested,
            );
            if matches!(requested, RequestStatus::InReview) {
                assert!(result.is_ok());
            } else {
                assert_eq!(
                    result.unwrap_err().code,
                    TransitionErrorCode::InvalidTransition
                );
            }
        }
    }

    #[test]
    fn decline_is_reachable_from_review_and_awaiting_prescribe() {
        assert!(check(
            RequestCategory::Prescription,
            RequestStatus::InReview,
            RequestStatus::Declined
        )
        .is_ok());
        assert!(check(
            RequestCategory::Prescription,
            RequestStatus::AwaitingPrescribe,
            RequestStatus::Declined
        )
        .is_ok());
    }

    #[test]
    fn validator_is_deterministic() {
        for _ in 0..3 {
            let first = check(
                RequestCategory::Prescription,
                RequestStatus::InReview,
                RequestStatus::Approved,
            );
            let second = check(
                RequestCategory::Prescription,
                RequestStatus::InReview,
                RequestStatus::Approved,
            );
            assert_eq!(first, second);
        }
    }
}
