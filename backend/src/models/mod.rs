pub mod audit_event;
pub mod doctor;
pub mod queue_item;
pub mod request;

pub use audit_event::{ActorType, AuditEvent, AuditEventResponse, AuditOutcome};
pub use doctor::Doctor;
pub use queue_item::QueueItem;
pub use request::{
    CreateRequestPayload, DeclineData, PaymentStatus, Request, RequestCategory, RequestResponse,
    RequestStatus, RiskTier,
};
