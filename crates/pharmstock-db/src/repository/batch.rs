//! # Batch Repository (Stock Ledger)
//!
//! Every change to a batch quantity goes through this module.
//!
//! ## Quantity Primitives
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Stock Ledger Operations                            │
//! │                                                                         │
//! │  find_or_create(conn, NewBatch)          purchase line received         │
//! │     INSERT ... ON CONFLICT (medicine_id, batch_number)                  │
//! │       DO UPDATE SET quantity = quantity + excluded.quantity             │
//! │     new batch:      all fields from the line                           │
//! │     existing batch: quantity only (prices / expiry keep first write)   │
//! │                                                                         │
//! │  decrement(conn, id, n) → bool           sale line, purchase reversal   │
//! │     UPDATE ... SET quantity = quantity - n                              │
//! │       WHERE id = ? AND quantity >= n                                    │
//! │     0 rows → false, nothing changed                                     │
//! │                                                                         │
//! │  increment(conn, id, n)                  sale reversal                  │
//! │     UPDATE ... SET quantity = quantity + n WHERE id = ?                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The write primitives take the caller's connection so they join its unit
//! of work. Each is a single statement, so the check and the change can't be
//! separated by another writer.
//!
//! Pool-backed reads cover stock lookups plus two alert views:
//! [`BatchRepository::low_stock`] and [`BatchRepository::expiring_within`].

use chrono::{Days, NaiveDate, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmstock_core::{Batch, ExpiringBatch, LowStockMedicine, NewBatch};

/// Repository for the stock ledger.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    // =========================================================================
    // Writes (caller's unit of work)
    // =========================================================================

    /// Adds incoming stock to the batch keyed by `(medicine_id, batch_number)`,
    /// creating it if absent. Returns the batch id.
    pub async fn find_or_create(conn: &mut SqliteConnection, batch: &NewBatch) -> DbResult<String> {
        let candidate_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let id: String = sqlx::query_scalar(
            r#"
            INSERT INTO batches (
                id, medicine_id, batch_number, quantity,
                unit_cost_cents, selling_price_cents,
                expiry_date, manufacture_date, supplier_id, location,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            ON CONFLICT (medicine_id, batch_number) DO UPDATE SET
                quantity = quantity + excluded.quantity,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(&candidate_id)
        .bind(&batch.medicine_id)
        .bind(&batch.batch_number)
        .bind(batch.quantity)
        .bind(batch.unit_cost_cents)
        .bind(batch.selling_price_cents)
        .bind(batch.expiry_date)
        .bind(batch.manufacture_date)
        .bind(&batch.supplier_id)
        .bind(&batch.location)
        .bind(now)
        .fetch_one(conn)
        .await?;

        if id == candidate_id {
            debug!(batch_id = %id, batch_number = %batch.batch_number, qty = batch.quantity, "Created batch");
        } else {
            debug!(batch_id = %id, batch_number = %batch.batch_number, qty = batch.quantity, "Restocked batch");
        }

        Ok(id)
    }

    /// Removes `quantity` units if the batch holds at least that many.
    ///
    /// Returns `false` without changing anything when stock is short or the
    /// batch doesn't exist.
    pub async fn decrement(conn: &mut SqliteConnection, batch_id: &str, quantity: i64) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE batches SET
                quantity = quantity - ?2,
                updated_at = ?3
            WHERE id = ?1 AND quantity >= ?2
            "#,
        )
        .bind(batch_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        let applied = result.rows_affected() == 1;
        debug!(batch_id = %batch_id, qty = quantity, applied, "Decrement batch");
        Ok(applied)
    }

    /// Adds `quantity` units back to a batch.
    pub async fn increment(conn: &mut SqliteConnection, batch_id: &str, quantity: i64) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE batches SET
                quantity = quantity + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(batch_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", batch_id));
        }

        debug!(batch_id = %batch_id, qty = quantity, "Increment batch");
        Ok(())
    }

    // =========================================================================
    // Reads inside a unit of work
    // =========================================================================

    /// Loads a batch on the caller's connection.
    pub async fn load(conn: &mut SqliteConnection, batch_id: &str) -> DbResult<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE id = ?1")
            .bind(batch_id)
            .fetch_optional(conn)
            .await?;

        Ok(batch)
    }

    /// Loads a batch by its business key on the caller's connection.
    pub async fn load_by_number(
        conn: &mut SqliteConnection,
        medicine_id: &str,
        batch_number: &str,
    ) -> DbResult<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(
            "SELECT * FROM batches WHERE medicine_id = ?1 AND batch_number = ?2",
        )
        .bind(medicine_id)
        .bind(batch_number)
        .fetch_optional(conn)
        .await?;

        Ok(batch)
    }

    /// Current quantity of a batch, `None` if it doesn't exist.
    pub async fn quantity(conn: &mut SqliteConnection, batch_id: &str) -> DbResult<Option<i64>> {
        let qty = sqlx::query_scalar("SELECT quantity FROM batches WHERE id = ?1")
            .bind(batch_id)
            .fetch_optional(conn)
            .await?;

        Ok(qty)
    }

    // =========================================================================
    // Pool reads
    // =========================================================================

    /// Batches of a medicine with stock on hand, soonest expiry first.
    ///
    /// Feed the result to [`pharmstock_core::pick_fefo`] to propose sale lines.
    pub async fn get_available(&self, medicine_id: &str) -> DbResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(
            r#"
            SELECT * FROM batches
            WHERE medicine_id = ?1 AND quantity > 0
            ORDER BY expiry_date ASC, batch_number ASC
            "#,
        )
        .bind(medicine_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    pub async fn get_by_id(&self, batch_id: &str) -> DbResult<Option<Batch>> {
        let mut conn = self.pool.acquire().await?;
        Self::load(&mut *conn, batch_id).await
    }

    pub async fn find_by_number(&self, medicine_id: &str, batch_number: &str) -> DbResult<Option<Batch>> {
        let mut conn = self.pool.acquire().await?;
        Self::load_by_number(&mut *conn, medicine_id, batch_number).await
    }

    /// Sum of quantities across every batch of a medicine.
    pub async fn total_quantity(&self, medicine_id: &str) -> DbResult<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM batches WHERE medicine_id = ?1")
                .bind(medicine_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(total)
    }

    // =========================================================================
    // Stock alerts
    // =========================================================================

    /// Active medicines whose stock across all batches is at or below their
    /// reorder level, lowest stock first. Medicines with no batches count as 0.
    pub async fn low_stock(&self) -> DbResult<Vec<LowStockMedicine>> {
        let rows = sqlx::query_as::<_, LowStockMedicine>(
            r#"
            SELECT m.id AS medicine_id, m.name, m.generic_name, m.reorder_level,
                   COALESCE(SUM(b.quantity), 0) AS total_quantity
            FROM medicines m
            LEFT JOIN batches b ON b.medicine_id = m.id
            WHERE m.is_active = 1
            GROUP BY m.id
            HAVING COALESCE(SUM(b.quantity), 0) <= m.reorder_level
            ORDER BY total_quantity ASC, m.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Batches with stock on hand expiring between `today` and `today + days`
    /// (both inclusive), soonest first. Already expired batches are left out.
    pub async fn expiring_within(&self, days: u32, today: NaiveDate) -> DbResult<Vec<ExpiringBatch>> {
        let horizon = today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);

        let rows = sqlx::query_as::<_, ExpiringBatch>(
            r#"
            SELECT b.*, m.name AS medicine_name
            FROM batches b
            JOIN medicines m ON m.id = b.medicine_id
            WHERE b.quantity > 0
              AND b.expiry_date >= ?1
              AND b.expiry_date <= ?2
            ORDER BY b.expiry_date ASC, b.batch_number ASC
            "#,
        )
        .bind(today)
        .bind(horizon)
        .fetch_all(&self.pool)
        .await?;

        debug!(days, count = rows.len(), "Expiring batches");
        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
