//! Doctor profile lookups. `reviewed_by` on requests is a weak reference
//! into this table; actor resolution for review actions happens here.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::doctor::Doctor;
use crate::types::DoctorId;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DoctorDirectoryTrait: Send + Sync {
    async fn find_by_id(&self, db: &PgPool, id: DoctorId) -> Result<Option<Doctor>, AppError>;

    async fn create(&self, db: &PgPool, doctor: &Doctor) -> Result<(), AppError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DoctorDirectory;

impl DoctorDirectory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DoctorDirectoryTrait for DoctorDirectory {
    async fn find_by_id(&self, db: &PgPool, id: DoctorId) -> Result<Option<Doctor>, AppError> {
        let row = sqlx::query_as::<_, Doctor>(
            "SELECT id, display_name, active, created_at FROM doctors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    async fn create(&self, db: &PgPool, doctor: &Doctor) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO doctors (id, display_name, active, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(doctor.id)
        .bind(&doctor.display_name)
        .bind(doctor.active)
        .bind(doctor.created_at)
        .execute(db)
        .await?;
        Ok(())
    }
}
