pub mod audit_log;
pub mod notify;
pub mod queue_sync;
pub mod refund;
pub mod review;

pub use audit_log::{AuditLogService, AuditLogTrait};
pub use notify::{EmailNotifier, StatusNotifier};
pub use queue_sync::{QueueSession, QueueSnapshot, QueueView};
pub use refund::{PaymentGateway, RefundOutcome, RefundPolicyEngine, RefundStatus};
pub use review::{ReviewOrchestrator, ReviewOutcome};
