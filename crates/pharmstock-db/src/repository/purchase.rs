//! # Purchase Repository
//!
//! Receives stock from suppliers. A purchase and every batch change it causes
//! are committed together or not at all.
//!
//! ## Submit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       submit(actor, header, items)                      │
//! │                                                                         │
//! │  validate_new_purchase()       ── ValidationFailed, nothing opened     │
//! │  authorize(RecordPurchase)     ── Forbidden                            │
//! │       │                                                                 │
//! │  BEGIN IMMEDIATE                                                        │
//! │  ├── supplier exists?          ── InvalidReference                     │
//! │  ├── INSERT purchases          ── DuplicateInvoice                     │
//! │  └── for each item, in order:                                          │
//! │      ├── medicine exists?      ── InvalidReference                     │
//! │      ├── INSERT purchase_items (line_no = position)                    │
//! │      └── BatchRepository::find_or_create (+quantity)                   │
//! │  COMMIT                        ── any error above: ROLLBACK            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delete Flow
//! Deleting a purchase takes back the stock it received. If some of that
//! stock has been sold in the meantime the delete is refused with
//! `InsufficientStock` and nothing changes.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::batch::BatchRepository;
use super::medicine::MedicineRepository;
use super::supplier::SupplierRepository;
use super::{authorize, header_insert_error};
use crate::error::{InventoryError, InventoryResult};
use crate::pool::UnitOfWork;
use pharmstock_core::validation::validate_new_purchase;
use pharmstock_core::{
    Actor, Capability, NewBatch, NewPurchase, NewPurchaseItem, Purchase, PurchaseDetail,
    PurchaseItemDetail, PurchasePaymentUpdate, ValidationError,
};

#[derive(FromRow)]
struct PurchaseRow {
    #[sqlx(flatten)]
    purchase: Purchase,
    supplier_name: String,
}

#[derive(FromRow)]
struct ReceivedLine {
    medicine_id: String,
    batch_number: String,
    quantity: i64,
}

fn overflowed(line_no: usize, field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: format!("items[{}].{}", line_no, field),
        min: 0,
        max: i64::MAX,
    }
}

/// Repository for purchase transactions.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
    default_markup_bps: u32,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool, default_markup_bps: u32) -> Self {
        PurchaseRepository {
            pool,
            default_markup_bps,
        }
    }

    /// Records a purchase and adds its quantities to stock.
    ///
    /// ## Returns
    /// The generated purchase id.
    ///
    /// ## Errors
    /// `ValidationFailed`, `Forbidden`, `InvalidReference` (supplier or
    /// medicine), `DuplicateInvoice`, `StorageFailure`.
    pub async fn submit(
        &self,
        actor: &Actor,
        purchase: NewPurchase,
        items: Vec<NewPurchaseItem>,
    ) -> InventoryResult<String> {
        validate_new_purchase(&purchase, &items, self.default_markup_bps)?;
        authorize(actor, Capability::RecordPurchase)?;

        let invoice_number = purchase.invoice_number.trim().to_string();
        let supplier_id = purchase.supplier_id.trim().to_string();
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        if !SupplierRepository::exists(uow.conn(), &supplier_id).await? {
            return Err(InventoryError::invalid_reference("supplier", supplier_id));
        }

        debug!(id = %id, invoice_number = %invoice_number, lines = items.len(), "Inserting purchase");

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, invoice_number, supplier_id, purchase_date,
                total_cents, tax_cents, discount_cents, net_cents,
                payment_status, payment_method, notes, user_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            "#,
        )
        .bind(&id)
        .bind(&invoice_number)
        .bind(&supplier_id)
        .bind(purchase.purchase_date)
        .bind(purchase.total_cents)
        .bind(purchase.tax_cents)
        .bind(purchase.discount_cents)
        .bind(purchase.net_cents)
        .bind(purchase.payment_status)
        .bind(&purchase.payment_method)
        .bind(&purchase.notes)
        .bind(&actor.user_id)
        .bind(now)
        .execute(uow.conn())
        .await
        .map_err(|e| header_insert_error(e, &invoice_number))?;

        for (line_no, item) in items.iter().enumerate() {
            let medicine_id = item.medicine_id.trim();
            let batch_number = item.batch_number.trim();
            let expiry_date = item.expiry_date.ok_or_else(|| ValidationError::Required {
                field: format!("items[{}].expiry_date", line_no),
            })?;
            let total_price_cents = item
                .resolved_total_cents()
                .ok_or_else(|| overflowed(line_no, "total_price_cents"))?;
            let selling_price_cents = item
                .resolved_selling_price_cents(self.default_markup_bps)
                .ok_or_else(|| overflowed(line_no, "selling_price_cents"))?;

            if !MedicineRepository::exists(uow.conn(), medicine_id).await? {
                return Err(InventoryError::invalid_reference("medicine", medicine_id));
            }

            sqlx::query(
                r#"
                INSERT INTO purchase_items (
                    id, purchase_id, line_no, medicine_id, batch_number,
                    quantity, unit_price_cents, total_price_cents,
                    expiry_date, manufacture_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(line_no as i64)
            .bind(medicine_id)
            .bind(batch_number)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(total_price_cents)
            .bind(expiry_date)
            .bind(item.manufacture_date)
            .execute(uow.conn())
            .await?;

            let batch = NewBatch {
                medicine_id: medicine_id.to_string(),
                batch_number: batch_number.to_string(),
                quantity: item.quantity,
                unit_cost_cents: item.unit_price_cents,
                selling_price_cents,
                expiry_date,
                manufacture_date: item.manufacture_date,
                supplier_id: Some(supplier_id.clone()),
                location: item.location.clone(),
            };
            BatchRepository::find_or_create(uow.conn(), &batch).await?;
        }

        uow.commit().await?;

        info!(
            id = %id,
            invoice_number = %invoice_number,
            user_id = %actor.user_id,
            lines = items.len(),
            "Purchase recorded"
        );
        Ok(id)
    }

    /// Deletes a purchase and takes its quantities back out of stock.
    ///
    /// ## Returns
    /// `false` if no purchase has this id (nothing changed).
    pub async fn delete(&self, actor: &Actor, purchase_id: &str) -> InventoryResult<bool> {
        authorize(actor, Capability::DeletePurchase)?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM purchases WHERE id = ?1")
            .bind(purchase_id)
            .fetch_optional(uow.conn())
            .await?;
        if found.is_none() {
            debug!(purchase_id = %purchase_id, "Purchase to delete not found");
            return Ok(false);
        }

        let lines = sqlx::query_as::<_, ReceivedLine>(
            r#"
            SELECT medicine_id, batch_number, quantity
            FROM purchase_items
            WHERE purchase_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(purchase_id)
        .fetch_all(uow.conn())
        .await?;

        for line in &lines {
            let batch = BatchRepository::load_by_number(uow.conn(), &line.medicine_id, &line.batch_number)
                .await?
                .ok_or_else(|| InventoryError::invalid_reference("batch", &line.batch_number))?;

            if !BatchRepository::decrement(uow.conn(), &batch.id, line.quantity).await? {
                let available = BatchRepository::quantity(uow.conn(), &batch.id)
                    .await?
                    .unwrap_or(0);
                warn!(
                    purchase_id = %purchase_id,
                    batch_id = %batch.id,
                    available,
                    requested = line.quantity,
                    "Purchased stock already sold, refusing delete"
                );
                return Err(InventoryError::InsufficientStock {
                    medicine_id: line.medicine_id.clone(),
                    batch_id: batch.id,
                    available,
                    requested: line.quantity,
                });
            }
        }

        sqlx::query("DELETE FROM purchases WHERE id = ?1")
            .bind(purchase_id)
            .execute(uow.conn())
            .await?;

        uow.commit().await?;

        info!(purchase_id = %purchase_id, user_id = %actor.user_id, lines = lines.len(), "Purchase deleted");
        Ok(true)
    }

    /// Updates payment status, method and notes. Stock is untouched.
    pub async fn update_payment(
        &self,
        actor: &Actor,
        purchase_id: &str,
        update: &PurchasePaymentUpdate,
    ) -> InventoryResult<()> {
        authorize(actor, Capability::UpdatePayment)?;

        let result = sqlx::query(
            r#"
            UPDATE purchases SET
                payment_status = ?2,
                payment_method = ?3,
                notes = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(purchase_id)
        .bind(update.payment_status)
        .bind(&update.payment_method)
        .bind(&update.notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InventoryError::not_found("Purchase", purchase_id));
        }

        debug!(purchase_id = %purchase_id, status = ?update.payment_status, "Purchase payment updated");
        Ok(())
    }

    /// Gets a purchase with its supplier name and line items in submission order.
    pub async fn find_by_id(&self, purchase_id: &str) -> InventoryResult<Option<PurchaseDetail>> {
        let row = sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT p.*, s.name AS supplier_name
            FROM purchases p
            JOIN suppliers s ON s.id = p.supplier_id
            WHERE p.id = ?1
            "#,
        )
        .bind(purchase_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, PurchaseItemDetail>(
            r#"
            SELECT pi.*, m.name AS medicine_name, m.generic_name
            FROM purchase_items pi
            JOIN medicines m ON m.id = pi.medicine_id
            WHERE pi.purchase_id = ?1
            ORDER BY pi.line_no
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(PurchaseDetail {
            purchase: row.purchase,
            supplier_name: row.supplier_name,
            items,
        }))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
