pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod repositories;
pub mod services;
pub mod sla;
pub mod state;
pub mod types;
pub mod validation;
