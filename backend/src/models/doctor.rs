use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::DoctorId;

/// Reviewer profile. `reviewed_by` on a request is a weak reference to this
/// table; deleting a doctor never cascades into request history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub id: DoctorId,
    pub display_name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Doctor {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: DoctorId::new(),
            display_name: display_name.into(),
            active: true,
            created_at: Utc::now(),
        }
    }
}
