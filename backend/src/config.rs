use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bind_port: u16,
    /// Capacity of the in-process change-feed channel.
    pub change_feed_capacity: usize,
    /// Minutes allotted per category for the review SLA at creation time.
    pub sla_minutes_prescription: i64,
    pub sla_minutes_certificate: i64,
    pub sla_minutes_consult: i64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/clinflow".to_string());

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let bind_port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| anyhow!("Invalid PORT value"))?;

        let change_feed_capacity = env::var("CHANGE_FEED_CAPACITY")
            .unwrap_or_else(|_| "256".to_string())
            .parse()
            .unwrap_or(256);

        let sla_minutes_prescription = parse_minutes("SLA_MINUTES_PRESCRIPTION", 60);
        let sla_minutes_certificate = parse_minutes("SLA_MINUTES_CERTIFICATE", 120);
        let sla_minutes_consult = parse_minutes("SLA_MINUTES_CONSULT", 240);

        Ok(Config {
            database_url,
            db_max_connections,
            bind_port,
            change_feed_capacity,
            sla_minutes_prescription,
            sla_minutes_certificate,
            sla_minutes_consult,
        })
    }

    pub fn sla_minutes_for(&self, category: crate::models::request::RequestCategory) -> i64 {
        use crate::models::request::RequestCategory::*;
        match category {
            Prescription => self.sla_minutes_prescription,
            MedicalCertificate => self.sla_minutes_certificate,
            ConsultNote => self.sla_minutes_consult,
        }
    }
}

fn parse_minutes(var: &str, default: i64) -> i64 {
    env::var(var)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
