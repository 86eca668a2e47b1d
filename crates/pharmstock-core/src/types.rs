//! # Domain Types
//!
//! Core domain types used throughout PharmStock.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐        ┌─────────────────────────┐                 │
//! │  │    Medicine     │◄───────│         Batch           │                 │
//! │  │  ─────────────  │  1..*  │  ─────────────────────  │                 │
//! │  │  id (UUID)      │        │  id (UUID)              │                 │
//! │  │  name           │        │  (medicine, batch_no) ◄─┼── unique        │
//! │  │  reorder_level  │        │  quantity ≥ 0           │                 │
//! │  └─────────────────┘        │  unit cost / price      │                 │
//! │          ▲                  │  expiry_date            │                 │
//! │          │                  └───────────▲─────────────┘                 │
//! │          │                              │ batch_id (sales only)         │
//! │  ┌───────┴─────────┐        ┌───────────┴─────────────┐                 │
//! │  │ PurchaseItem    │        │       SaleItem          │                 │
//! │  │ medicine +      │        │ medicine + batch_id     │                 │
//! │  │ batch_number    │        │ quantity, prices        │                 │
//! │  └───────▲─────────┘        └───────────▲─────────────┘                 │
//! │          │ owned (cascade)              │ owned (cascade)               │
//! │  ┌───────┴─────────┐        ┌───────────┴─────────────┐                 │
//! │  │    Purchase     │        │         Sale            │                 │
//! │  │ invoice_number  │        │ invoice_number          │                 │
//! │  └─────────────────┘        └─────────────────────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business key: (batch_number, invoice_number) - human-readable

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Catalog
// =============================================================================

/// A catalog entry for a medicine.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Medicine {
    pub id: String,
    pub name: String,
    pub generic_name: Option<String>,
    /// Total stock at or below this level means the medicine needs reordering.
    pub reorder_level: i64,
    pub requires_prescription: bool,
    /// Inactive medicines stay referenced by history but are hidden from sale.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A supplier that purchases are received from.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub company_name: Option<String>,
    pub phone: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMedicine {
    pub name: String,
    #[serde(default)]
    pub generic_name: Option<String>,
    /// Defaults to [`crate::DEFAULT_REORDER_LEVEL`].
    #[serde(default)]
    pub reorder_level: Option<i64>,
    #[serde(default)]
    pub requires_prescription: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSupplier {
    pub name: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub phone: String,
}

// =============================================================================
// Batch
// =============================================================================

/// A received lot of one medicine.
///
/// `quantity` never drops below zero: the storage layer rejects any
/// decrement that would take it there.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Batch {
    pub id: String,
    pub medicine_id: String,
    pub batch_number: String,
    pub quantity: i64,
    /// Cost per unit from the purchase that created this batch.
    pub unit_cost_cents: i64,
    pub selling_price_cents: i64,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub manufacture_date: Option<NaiveDate>,
    pub supplier_id: Option<String>,
    pub location: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Returns true if the batch is expired on `today`.
    #[inline]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }
}

/// Incoming stock for a batch, created or merged by `(medicine_id, batch_number)`.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub medicine_id: String,
    pub batch_number: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub selling_price_cents: i64,
    pub expiry_date: NaiveDate,
    pub manufacture_date: Option<NaiveDate>,
    pub supplier_id: Option<String>,
    pub location: Option<String>,
}

/// An active medicine whose total stock is at or below its reorder level.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LowStockMedicine {
    pub medicine_id: String,
    pub name: String,
    pub generic_name: Option<String>,
    pub reorder_level: i64,
    /// Sum over every batch of the medicine, 0 when it has none.
    pub total_quantity: i64,
}

/// A batch with stock on hand that expires soon.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ExpiringBatch {
    #[serde(flatten)]
    #[ts(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub batch: Batch,
    pub medicine_name: String,
}

/// One proposed draw from a batch when filling a requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BatchPick {
    pub batch_id: String,
    pub quantity: i64,
}

/// Proposes a first-expiry-first-out allocation of `requested` units.
///
/// `batches` should all belong to one medicine. Expired and empty batches are
/// skipped. The result draws from the soonest-expiring batches first; the
/// caller decides whether to use it when building sale line items.
///
/// ## Example
/// ```text
/// batches: B1 (exp 2026-01, qty 4), B2 (exp 2025-06, qty 3)
/// pick_fefo(batches, 5) → [B2 × 3, B1 × 2]
/// ```
pub fn pick_fefo(
    medicine_id: &str,
    batches: &[Batch],
    requested: i64,
    today: NaiveDate,
) -> CoreResult<Vec<BatchPick>> {
    let mut candidates: Vec<&Batch> = batches
        .iter()
        .filter(|b| b.quantity > 0 && !b.is_expired(today))
        .collect();
    candidates.sort_by(|a, b| {
        a.expiry_date
            .cmp(&b.expiry_date)
            .then_with(|| a.batch_number.cmp(&b.batch_number))
    });

    let available = candidates
        .iter()
        .try_fold(0i64, |acc, b| acc.checked_add(b.quantity))
        .ok_or_else(|| CoreError::QuantityOverflow {
            context: format!("available stock of {}", medicine_id),
        })?;

    if available < requested {
        return Err(CoreError::InsufficientStock {
            medicine_id: medicine_id.to_string(),
            available,
            requested,
        });
    }

    let mut remaining = requested;
    let mut picks = Vec::new();
    for batch in candidates {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(batch.quantity);
        picks.push(BatchPick {
            batch_id: batch.id.clone(),
            quantity: take,
        });
        remaining -= take;
    }

    Ok(picks)
}

// =============================================================================
// Payment Status / Method
// =============================================================================

/// Settlement state of a purchase or sale invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
}

/// How a sale was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Insurance,
    Other,
}

// =============================================================================
// Purchase
// =============================================================================

/// Header of a stock receipt from a supplier.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub invoice_number: String,
    pub supplier_id: String,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    pub total_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub net_cents: i64,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    /// Originating identity.
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A line of a purchase. Identifies its batch by number, not id: the batch
/// may not exist until this line creates it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    /// Zero-based position in the submitted sequence.
    pub line_no: i64,
    pub medicine_id: String,
    pub batch_number: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub manufacture_date: Option<NaiveDate>,
}

/// Purchase header as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchase {
    pub invoice_number: String,
    pub supplier_id: String,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    pub total_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    pub net_cents: i64,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Purchase line as submitted by the caller.
///
/// Optional fields are resolved by the engine: `total_price_cents` defaults
/// to `unit_price_cents × quantity`, `selling_price_cents` to the unit price
/// plus the configured markup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchaseItem {
    pub medicine_id: String,
    pub batch_number: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub total_price_cents: Option<i64>,
    #[serde(default)]
    pub selling_price_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub manufacture_date: Option<NaiveDate>,
    /// Shelf location, used only when this line creates the batch.
    #[serde(default)]
    pub location: Option<String>,
}

impl NewPurchaseItem {
    /// Line total, falling back to `unit_price × quantity`.
    ///
    /// `None` if the fallback overflows.
    pub fn resolved_total_cents(&self) -> Option<i64> {
        match self.total_price_cents {
            Some(total) => Some(total),
            None => Money::from_cents(self.unit_price_cents)
                .checked_line_total(self.quantity)
                .map(|m| m.cents()),
        }
    }

    /// Selling price for a newly created batch.
    ///
    /// `None` if the marked-up unit price overflows.
    pub fn resolved_selling_price_cents(&self, markup_bps: u32) -> Option<i64> {
        match self.selling_price_cents {
            Some(price) => Some(price),
            None => Money::from_cents(self.unit_price_cents)
                .apply_markup(markup_bps)
                .map(|m| m.cents()),
        }
    }
}

/// Mutable fields of a recorded purchase.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchasePaymentUpdate {
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Purchase line joined with medicine display fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItemDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub item: PurchaseItem,
    pub medicine_name: String,
    pub generic_name: Option<String>,
}

/// Read-side reconstruction of a purchase.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub purchase: Purchase,
    pub supplier_name: String,
    pub items: Vec<PurchaseItemDetail>,
}

// =============================================================================
// Sale
// =============================================================================

/// Header of a sale to a customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub invoice_number: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub total_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub net_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub prescription_number: Option<String>,
    pub notes: Option<String>,
    /// Originating identity.
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A line of a sale, pinned to the batch the stock was taken from.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub line_no: i64,
    pub medicine_id: String,
    pub batch_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
}

fn default_paid() -> PaymentStatus {
    PaymentStatus::Paid
}

/// Sale header as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub invoice_number: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Defaults to the submission instant.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub sale_date: Option<DateTime<Utc>>,
    pub total_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    pub net_cents: i64,
    pub payment_method: PaymentMethod,
    #[serde(default = "default_paid")]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub prescription_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Sale line as submitted by the caller. The batch is chosen by the caller
/// (see [`pick_fefo`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaleItem {
    pub medicine_id: String,
    pub batch_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub total_price_cents: Option<i64>,
}

impl NewSaleItem {
    /// Line total, falling back to `unit_price × quantity`.
    ///
    /// `None` if the fallback overflows.
    pub fn resolved_total_cents(&self) -> Option<i64> {
        match self.total_price_cents {
            Some(total) => Some(total),
            None => Money::from_cents(self.unit_price_cents)
                .checked_line_total(self.quantity)
                .map(|m| m.cents()),
        }
    }
}

/// Mutable fields of a recorded sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalePaymentUpdate {
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
}

/// Sale line joined with medicine and batch display fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItemDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub item: SaleItem,
    pub medicine_name: String,
    pub generic_name: Option<String>,
    pub batch_number: String,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
}

/// Read-side reconstruction of a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItemDetail>,
}

// =============================================================================
// Unit Tests
// =============================================================================
