//! # Medicine Repository
//!
//! Minimal catalog access: the engine only needs to know a medicine exists.

use chrono::Utc;
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmstock_core::validation::validate_name;
use pharmstock_core::{Medicine, NewMedicine, DEFAULT_REORDER_LEVEL};

/// Repository for medicine database operations.
#[derive(Debug, Clone)]
pub struct MedicineRepository {
    pool: SqlitePool,
}

impl MedicineRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MedicineRepository { pool }
    }

    /// Inserts a medicine and returns the stored row.
    pub async fn insert(&self, medicine: &NewMedicine) -> DbResult<Medicine> {
        let name = validate_name("name", &medicine.name)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, name = %name, "Inserting medicine");

        sqlx::query(
            r#"
            INSERT INTO medicines (
                id, name, generic_name, reorder_level,
                requires_prescription, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)
            "#,
        )
        .bind(&id)
        .bind(&name)
        .bind(&medicine.generic_name)
        .bind(medicine.reorder_level.unwrap_or(DEFAULT_REORDER_LEVEL))
        .bind(medicine.requires_prescription)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Medicine", id))
    }

    /// Gets a medicine by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>("SELECT * FROM medicines WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(medicine)
    }

    /// Returns true if the medicine exists. Runs on the caller's unit of work.
    pub async fn exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM medicines WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let medicine = db
            .medicines()
            .insert(&NewMedicine {
                name: "  Amoxicillin 500mg ".into(),
                generic_name: Some("Amoxicillin".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(medicine.name, "Amoxicillin 500mg");
        assert_eq!(medicine.reorder_level, DEFAULT_REORDER_LEVEL);
        assert!(medicine.is_active);
        assert!(!medicine.requires_prescription);

        let fetched = db.medicines().get_by_id(&medicine.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, medicine.id);
    }

    #[tokio::test]
    async fn test_exists() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let medicine = db
            .medicines()
            .insert(&NewMedicine {
                name: "Ibuprofen".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut uow = db.begin().await.unwrap();
        assert!(MedicineRepository::exists(uow.conn(), &medicine.id).await.unwrap());
        assert!(!MedicineRepository::exists(uow.conn(), "missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let result = db.medicines().insert(&NewMedicine::default()).await;
        assert!(matches!(result, Err(DbError::Validation(_))));
    }
}
