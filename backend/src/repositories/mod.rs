pub mod audit_event;
pub mod doctor;
pub mod request;

pub use doctor::{DoctorDirectory, DoctorDirectoryTrait};
pub use request::{RequestRepository, RequestRepositoryTrait, TransitionPatch};

#[cfg(test)]
pub use doctor::MockDoctorDirectoryTrait;
#[cfg(test)]
pub use request::MockRequestRepositoryTrait;
