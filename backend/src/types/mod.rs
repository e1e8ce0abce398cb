mod id;

pub use id::{AuditEventId, DoctorId, RequestId};
