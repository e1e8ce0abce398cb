use clinflow_backend::lifecycle::{validate_transition, TransitionErrorCode};
use clinflow_backend::models::request::RequestStatus::*;
use clinflow_backend::models::request::{PaymentStatus, RequestCategory, RequestStatus};

fn walk(category: RequestCategory, path: &[RequestStatus]) {
    for pair in path.windows(2) {
        validate_transition(category, pair[0], pair[1], PaymentStatus::Paid).unwrap_or_else(|err| {
            panic!(
                "{:?} -> {:?} should be legal for {:?}: {err}",
                pair[0], pair[1], category
            )
        });
    }
}

#[test]
fn prescription_full_happy_path() {
    walk(
        RequestCategory::Prescription,
        &[Pending, InReview, AwaitingPrescribe, Approved],
    );
}

#[test]
fn certificate_approves_straight_out_of_review() {
    walk(
        RequestCategory::MedicalCertificate,
        &[Pending, InReview, Approved],
    );
}

#[test]
fn info_loop_returns_to_review() {
    walk(
        RequestCategory::ConsultNote,
        &[Pending, InReview, PendingInfo, InReview, Approved],
    );
}

#[test]
fn follow_up_only_exits_through_review() {
    walk(
        RequestCategory::Prescription,
        &[InReview, NeedsFollowUp, InReview],
    );
    for target in [Approved, Declined, PendingInfo, AwaitingPrescribe, Pending] {
        let err = validate_transition(
            RequestCategory::Prescription,
            NeedsFollowUp,
            target,
            PaymentStatus::Paid,
        )
        .unwrap_err();
        assert_eq!(err.code, TransitionErrorCode::InvalidTransition);
    }
}

#[test]
fn non_prescription_never_enters_awaiting_prescribe() {
    for category in [RequestCategory::MedicalCertificate, RequestCategory::ConsultNote] {
        let err =
            validate_transition(category, InReview, AwaitingPrescribe, PaymentStatus::Paid)
                .unwrap_err();
        assert_eq!(err.code, TransitionErrorCode::InvalidTransition);
    }
}

#[test]
fn prescription_cannot_skip_script_issuance() {
    let err = validate_transition(
        RequestCategory::Prescription,
        InReview,
        Approved,
        PaymentStatus::Paid,
    )
    .unwrap_err();
    assert_eq!(err.code, TransitionErrorCode::InvalidTransition);
}

#[test]
fn terminal_states_reject_everything_first() {
    for current in [Approved, Declined] {
        for requested in [Pending, InReview, PendingInfo, AwaitingPrescribe, NeedsFollowUp, Approved, Declined] {
            // Terminal lock wins even when payment would also fail the check.
            for payment in [
                PaymentStatus::PendingPayment,
                PaymentStatus::Paid,
                PaymentStatus::Refunded,
                PaymentStatus::RefundFailed,
            ] {
                let err = validate_transition(
                    RequestCategory::Prescription,
                    current,
                    requested,
                    payment,
                )
                .unwrap_err();
                assert_eq!(err.code, TransitionErrorCode::TerminalState);
            }
        }
    }
}

#[test]
fn unpaid_requests_are_gated_before_adjacency() {
    // An illegal hop on an unpaid request still reports the payment gate.
    for payment in [PaymentStatus::PendingPayment, PaymentStatus::RefundFailed] {
        let err = validate_transition(
            RequestCategory::ConsultNote,
            Pending,
            Approved,
            payment,
        )
        .unwrap_err();
        assert_eq!(err.code, TransitionErrorCode::PaymentRequired);
    }
}

#[test]
fn decline_is_reachable_from_review_and_prescribe_only() {
    walk(RequestCategory::Prescription, &[InReview, Declined]);
    walk(RequestCategory::Prescription, &[AwaitingPrescribe, Declined]);
    for current in [Pending, PendingInfo, NeedsFollowUp] {
        let err = validate_transition(
            RequestCategory::Prescription,
            current,
            Declined,
            PaymentStatus::Paid,
        )
        .unwrap_err();
        assert_eq!(err.code, TransitionErrorCode::InvalidTransition);
    }
}
