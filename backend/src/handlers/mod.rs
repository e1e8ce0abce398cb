pub mod queue;
pub mod requests;
