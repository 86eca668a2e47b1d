//! # Repository Module
//!
//! Storage access and the transaction engine for PharmStock.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Units of Work                       │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │  db.sales().submit(&actor, header, items)                      │
//! │       ▼                                                                 │
//! │  SaleRepository / PurchaseRepository      (engine: one UnitOfWork     │
//! │  ├── submit / delete / update_payment      per call, commit or drop)   │
//! │  └── find_by_id                                                        │
//! │       │  conn()                                                         │
//! │       ▼                                                                 │
//! │  BatchRepository                          (stock ledger primitives    │
//! │  ├── find_or_create / increment / decrement   on the caller's conn)   │
//! │  └── get_available / get_by_id / total_quantity                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`BatchRepository`](batch::BatchRepository) - Stock ledger
//! - [`PurchaseRepository`](purchase::PurchaseRepository) - Inbound transactions
//! - [`SaleRepository`](sale::SaleRepository) - Outbound transactions
//! - [`MedicineRepository`](medicine::MedicineRepository) - Catalog
//! - [`SupplierRepository`](supplier::SupplierRepository) - Suppliers

pub mod batch;
pub mod medicine;
pub mod purchase;
pub mod sale;
pub mod supplier;

use pharmstock_core::{Actor, Capability};
use tracing::warn;

use crate::error::{DbError, InventoryError, InventoryResult};

/// Rejects the call unless the actor's role grants `capability`.
pub(crate) fn authorize(actor: &Actor, capability: Capability) -> InventoryResult<()> {
    if actor.can(capability) {
        return Ok(());
    }

    warn!(user_id = %actor.user_id, role = %actor.role, %capability, "Capability denied");
    Err(InventoryError::Forbidden {
        role: actor.role,
        capability,
    })
}

/// Maps a failed header insert: a UNIQUE hit on `invoice_number` is a
/// duplicate invoice, anything else keeps its storage meaning.
pub(crate) fn header_insert_error(err: sqlx::Error, invoice_number: &str) -> InventoryError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } if field.ends_with("invoice_number") => {
            InventoryError::DuplicateInvoice {
                invoice_number: invoice_number.to_string(),
            }
        }
        other => other.into(),
    }
}
