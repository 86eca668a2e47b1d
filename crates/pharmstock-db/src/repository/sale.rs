//! # Sale Repository
//!
//! Takes stock out of specific batches. A sale either removes every line's
//! quantity or none of them.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. SUBMIT (one unit of work)                                          │
//! │     └── INSERT sales                                                   │
//! │     └── per line: batch exists + belongs to medicine                   │
//! │                   quantity ≥ requested   else InsufficientStock        │
//! │                   INSERT sale_items                                    │
//! │                   decrement (conditional) else InsufficientStock       │
//! │                                                                         │
//! │  2. (OPTIONAL) UPDATE PAYMENT                                          │
//! │     └── status + notes only, stock untouched                           │
//! │                                                                         │
//! │  3. (OPTIONAL) DELETE (one unit of work)                               │
//! │     └── per line: increment batch by line quantity                     │
//! │     └── DELETE sales (lines cascade)                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Concurrent sales of the same batch serialize on the SQLite write lock.
//! The conditional decrement is the last word: whichever sale commits second
//! sees the reduced quantity and fails.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::batch::BatchRepository;
use super::{authorize, header_insert_error};
use crate::error::{InventoryError, InventoryResult};
use crate::pool::UnitOfWork;
use pharmstock_core::validation::validate_new_sale;
use pharmstock_core::{
    Actor, Capability, NewSale, NewSaleItem, Sale, SaleDetail, SaleItemDetail, SalePaymentUpdate,
    ValidationError,
};

#[derive(FromRow)]
struct SoldLine {
    batch_id: String,
    quantity: i64,
}

/// Repository for sale transactions.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale and removes its quantities from the named batches.
    ///
    /// ## Returns
    /// The generated sale id.
    ///
    /// ## Errors
    /// `ValidationFailed`, `Forbidden`, `InvalidReference` (missing batch or
    /// batch of another medicine), `InsufficientStock`, `DuplicateInvoice`,
    /// `StorageFailure`.
    pub async fn submit(
        &self,
        actor: &Actor,
        sale: NewSale,
        items: Vec<NewSaleItem>,
    ) -> InventoryResult<String> {
        validate_new_sale(&sale, &items)?;
        authorize(actor, Capability::RecordSale)?;

        let invoice_number = sale.invoice_number.trim().to_string();
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let sale_date = sale.sale_date.unwrap_or(now);

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        debug!(id = %id, invoice_number = %invoice_number, lines = items.len(), "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, customer_name, customer_phone, customer_email,
                sale_date, total_cents, tax_cents, discount_cents, net_cents,
                payment_method, payment_status, prescription_number, notes, user_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
            "#,
        )
        .bind(&id)
        .bind(&invoice_number)
        .bind(&sale.customer_name)
        .bind(&sale.customer_phone)
        .bind(&sale.customer_email)
        .bind(sale_date)
        .bind(sale.total_cents)
        .bind(sale.tax_cents)
        .bind(sale.discount_cents)
        .bind(sale.net_cents)
        .bind(sale.payment_method)
        .bind(sale.payment_status)
        .bind(&sale.prescription_number)
        .bind(&sale.notes)
        .bind(&actor.user_id)
        .bind(now)
        .execute(uow.conn())
        .await
        .map_err(|e| header_insert_error(e, &invoice_number))?;

        for (line_no, item) in items.iter().enumerate() {
            let medicine_id = item.medicine_id.trim();
            let batch_id = item.batch_id.trim();

            let batch = BatchRepository::load(uow.conn(), batch_id)
                .await?
                .ok_or_else(|| InventoryError::invalid_reference("batch", batch_id))?;

            if batch.medicine_id != medicine_id {
                warn!(
                    batch_id = %batch_id,
                    batch_medicine = %batch.medicine_id,
                    line_medicine = %medicine_id,
                    "Batch belongs to another medicine"
                );
                return Err(InventoryError::invalid_reference("batch", batch_id));
            }

            if batch.quantity < item.quantity {
                warn!(batch_id = %batch_id, available = batch.quantity, requested = item.quantity, "Insufficient stock");
                return Err(InventoryError::InsufficientStock {
                    medicine_id: medicine_id.to_string(),
                    batch_id: batch_id.to_string(),
                    available: batch.quantity,
                    requested: item.quantity,
                });
            }

            let total_price_cents = item.resolved_total_cents().ok_or_else(|| {
                ValidationError::OutOfRange {
                    field: format!("items[{}].total_price_cents", line_no),
                    min: 0,
                    max: i64::MAX,
                }
            })?;

            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, line_no, medicine_id, batch_id,
                    quantity, unit_price_cents, total_price_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(line_no as i64)
            .bind(medicine_id)
            .bind(batch_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(total_price_cents)
            .execute(uow.conn())
            .await?;

            if !BatchRepository::decrement(uow.conn(), batch_id, item.quantity).await? {
                let available = BatchRepository::quantity(uow.conn(), batch_id)
                    .await?
                    .unwrap_or(0);
                warn!(batch_id = %batch_id, available, requested = item.quantity, "Insufficient stock");
                return Err(InventoryError::InsufficientStock {
                    medicine_id: medicine_id.to_string(),
                    batch_id: batch_id.to_string(),
                    available,
                    requested: item.quantity,
                });
            }
        }

        uow.commit().await?;

        info!(
            id = %id,
            invoice_number = %invoice_number,
            user_id = %actor.user_id,
            lines = items.len(),
            "Sale recorded"
        );
        Ok(id)
    }

    /// Deletes a sale and returns its quantities to the batches they came from.
    ///
    /// ## Returns
    /// `false` if no sale has this id (nothing changed).
    pub async fn delete(&self, actor: &Actor, sale_id: &str) -> InventoryResult<bool> {
        authorize(actor, Capability::DeleteSale)?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM sales WHERE id = ?1")
            .bind(sale_id)
            .fetch_optional(uow.conn())
            .await?;
        if found.is_none() {
            debug!(sale_id = %sale_id, "Sale to delete not found");
            return Ok(false);
        }

        let lines = sqlx::query_as::<_, SoldLine>(
            "SELECT batch_id, quantity FROM sale_items WHERE sale_id = ?1 ORDER BY line_no",
        )
        .bind(sale_id)
        .fetch_all(uow.conn())
        .await?;

        for line in &lines {
            BatchRepository::increment(uow.conn(), &line.batch_id, line.quantity).await?;
        }

        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(sale_id)
            .execute(uow.conn())
            .await?;

        uow.commit().await?;

        info!(sale_id = %sale_id, user_id = %actor.user_id, lines = lines.len(), "Sale deleted, stock restored");
        Ok(true)
    }

    /// Updates payment status and notes. Stock is untouched.
    pub async fn update_payment(
        &self,
        actor: &Actor,
        sale_id: &str,
        update: &SalePaymentUpdate,
    ) -> InventoryResult<()> {
        authorize(actor, Capability::UpdatePayment)?;

        let result = sqlx::query(
            "UPDATE sales SET payment_status = ?2, notes = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(sale_id)
        .bind(update.payment_status)
        .bind(&update.notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InventoryError::not_found("Sale", sale_id));
        }

        debug!(sale_id = %sale_id, status = ?update.payment_status, "Sale payment updated");
        Ok(())
    }

    /// Gets a sale with its line items in submission order, each joined with
    /// the medicine name and the batch number and expiry.
    pub async fn find_by_id(&self, sale_id: &str) -> InventoryResult<Option<SaleDetail>> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(sale) = sale else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, SaleItemDetail>(
            r#"
            SELECT si.*,
                   m.name AS medicine_name, m.generic_name,
                   b.batch_number, b.expiry_date
            FROM sale_items si
            JOIN medicines m ON m.id = si.medicine_id
            JOIN batches b ON b.id = si.batch_id
            WHERE si.sale_id = ?1
            ORDER BY si.line_no
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(SaleDetail { sale, items }))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use pharmstock_core::{
        NewMedicine, NewPurchase, NewPurchaseItem, NewSupplier, PaymentMethod, PaymentStatus, Role,
    };

    struct Fixture {
        db: Database,
        medicine_id: String,
        batch_id: String,
        staff: Actor,
        admin: Actor,
    }

    /// One medicine with one batch of `stock` units.
    async fn fixture(stock: i64) -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let admin = Actor::new("u-admin", Role::Admin);

        let supplier = db
            .suppliers()
            .insert(&NewSupplier {
                name: "MedSupply".into(),
                phone: "555".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let medicine = db
            .medicines()
            .insert(&NewMedicine {
                name: "Omeprazole 20mg".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        db.purchases()
            .submit(
                &admin,
                NewPurchase {
                    invoice_number: "PO-1".into(),
                    supplier_id: supplier.id,
                    purchase_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                    total_cents: 0,
                    tax_cents: 0,
                    discount_cents: 0,
                    net_cents: 0,
                    payment_status: PaymentStatus::Paid,
                    payment_method: None,
                    notes: None,
                },
                vec![NewPurchaseItem {
                    medicine_id: medicine.id.clone(),
                    batch_number: "B1".into(),
                    quantity: stock,
                    unit_price_cents: 200,
                    expiry_date: NaiveDate::from_ymd_opt(2027, 1, 1),
                    ..Default::default()
                }],
            )
            .await
            .unwrap();

        let batch = db.batches().find_by_number(&medicine.id, "B1").await.unwrap().unwrap();

        Fixture {
            db,
            medicine_id: medicine.id,
            batch_id: batch.id,
            staff: Actor::new("u-staff", Role::Staff),
            admin,
        }
    }

    fn header(invoice: &str) -> NewSale {
        NewSale {
            invoice_number: invoice.into(),
            customer_name: Some("Walk-in".into()),
            customer_phone: None,
            customer_email: None,
            sale_date: None,
            total_cents: 0,
            tax_cents: 0,
            discount_cents: 0,
            net_cents: 0,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Paid,
            prescription_number: None,
            notes: None,
        }
    }

    fn line(f: &Fixture, qty: i64) -> NewSaleItem {
        NewSaleItem {
            medicine_id: f.medicine_id.clone(),
            batch_id: f.batch_id.clone(),
            quantity: qty,
            unit_price_cents: 260,
            total_price_cents: None,
        }
    }

    async fn stock(f: &Fixture) -> i64 {
        f.db.batches().get_by_id(&f.batch_id).await.unwrap().unwrap().quantity
    }

    #[tokio::test]
    async fn test_staff_can_sell() {
        let f = fixture(10).await;

        let id = f.db.sales().submit(&f.staff, header("S-1"), vec![line(&f, 3)]).await.unwrap();

        assert_eq!(stock(&f).await, 7);
        let detail = f.db.sales().find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(detail.sale.user_id, "u-staff");
        assert_eq!(detail.items[0].item.total_price_cents, 780);
        assert_eq!(detail.items[0].batch_number, "B1");
    }

    #[tokio::test]
    async fn test_detail_json_is_flat() {
        let f = fixture(10).await;
        let id = f.db.sales().submit(&f.staff, header("S-9"), vec![line(&f, 1)]).await.unwrap();

        let detail = f.db.sales().find_by_id(&id).await.unwrap().unwrap();
        let json = serde_json::to_value(&detail).unwrap();

        assert_eq!(json["invoice_number"], "S-9");
        assert_eq!(json["payment_method"], "cash");
        assert_eq!(json["payment_status"], "paid");
        assert_eq!(json["items"][0]["batch_number"], "B1");
        assert_eq!(json["items"][0]["expiry_date"], "2027-01-01");
        assert_eq!(json["items"][0]["quantity"], 1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_nothing_behind() {
        let f = fixture(5).await;

        let err = f
            .db
            .sales()
            .submit(&f.staff, header("S-1"), vec![line(&f, 2), line(&f, 4)])
            .await
            .unwrap_err();

        match err {
            InventoryError::InsufficientStock {
                medicine_id,
                batch_id,
                available,
                requested,
            } => {
                assert_eq!(medicine_id, f.medicine_id);
                assert_eq!(batch_id, f.batch_id);
                assert_eq!(available, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(stock(&f).await, 5);
        let sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(f.db.pool())
            .await
            .unwrap();
        assert_eq!(sales, 0);
    }

    #[tokio::test]
    async fn test_line_total_overflow_rejected() {
        let f = fixture(10).await;
        let mut item = line(&f, 3);
        item.unit_price_cents = i64::MAX / 2;

        let err = f.db.sales().submit(&f.staff, header("S-1"), vec![item]).await.unwrap_err();

        match err {
            InventoryError::ValidationFailed(e) => {
                assert_eq!(e.field(), "items[0].total_price_cents")
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
        assert_eq!(stock(&f).await, 10);
    }

    #[tokio::test]
    async fn test_missing_batch_is_invalid_reference() {
        let f = fixture(5).await;
        let mut item = line(&f, 1);
        item.batch_id = "no-such-batch".into();

        let err = f.db.sales().submit(&f.staff, header("S-1"), vec![item]).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_REFERENCE");
    }

    #[tokio::test]
    async fn test_batch_of_other_medicine_rejected() {
        let f = fixture(5).await;
        let other = f
            .db
            .medicines()
            .insert(&NewMedicine {
                name: "Loratadine".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let mut item = line(&f, 1);
        item.medicine_id = other.id;

        let err = f.db.sales().submit(&f.staff, header("S-1"), vec![item]).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_REFERENCE");
        assert_eq!(stock(&f).await, 5);
    }

    #[tokio::test]
    async fn test_duplicate_invoice_keeps_first_sale() {
        let f = fixture(10).await;
        let sales = f.db.sales();

        sales.submit(&f.staff, header("S-1"), vec![line(&f, 1)]).await.unwrap();
        let err = sales
            .submit(&f.staff, header("S-1"), vec![line(&f, 1)])
            .await
            .unwrap_err();

        assert_eq!(err.code(), "DUPLICATE_INVOICE");
        assert_eq!(stock(&f).await, 9);
    }

    #[tokio::test]
    async fn test_delete_restores_stock() {
        let f = fixture(100).await;
        let sales = f.db.sales();

        let id = sales
            .submit(&f.staff, header("S-1"), vec![line(&f, 20), line(&f, 30)])
            .await
            .unwrap();
        assert_eq!(stock(&f).await, 50);

        assert!(sales.delete(&f.admin, &id).await.unwrap());
        assert_eq!(stock(&f).await, 100);
        assert!(sales.find_by_id(&id).await.unwrap().is_none());

        // Second delete is a no-op
        assert!(!sales.delete(&f.admin, &id).await.unwrap());
        assert_eq!(stock(&f).await, 100);
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let f = fixture(10).await;
        let id = f.db.sales().submit(&f.staff, header("S-1"), vec![line(&f, 2)]).await.unwrap();

        let pharmacist = Actor::new("u-pharm", Role::Pharmacist);
        let err = f.db.sales().delete(&pharmacist, &id).await.unwrap_err();

        assert_eq!(err.code(), "FORBIDDEN");
        assert_eq!(stock(&f).await, 8);
    }

    #[tokio::test]
    async fn test_update_payment() {
        let f = fixture(10).await;
        let sales = f.db.sales();
        let mut head = header("S-1");
        head.payment_status = PaymentStatus::Pending;
        head.payment_method = PaymentMethod::Insurance;
        let id = sales.submit(&f.staff, head, vec![line(&f, 2)]).await.unwrap();

        let update = SalePaymentUpdate {
            payment_status: PaymentStatus::Paid,
            notes: Some("claim approved".into()),
        };

        let err = sales.update_payment(&f.staff, &id, &update).await.unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");

        sales.update_payment(&f.admin, &id, &update).await.unwrap();
        let detail = sales.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(detail.sale.payment_status, PaymentStatus::Paid);
        assert_eq!(detail.sale.payment_method, PaymentMethod::Insurance);
        assert_eq!(detail.sale.notes.as_deref(), Some("claim approved"));
        assert_eq!(stock(&f).await, 8);
    }
}
