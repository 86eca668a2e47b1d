//! # pharmstock-db: Transaction Engine for PharmStock
//!
//! Owns the SQLite store and every operation that moves stock: purchases add
//! quantity to batches, sales take it away, deletes put it back.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PharmStock Data Flow                             │
//! │                                                                         │
//! │  HTTP handler (authenticated Actor + header + items)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   pharmstock-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐ │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │ │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │ │   │
//! │  │   │               │    │ PurchaseRepo   │    │              │ │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo       │    │ 001_initial_ │ │   │
//! │  │   │ UnitOfWork    │    │ BatchRepo      │    │  schema.sql  │ │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘ │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `pharmstock.toml` loading with env overrides
//! - [`pool`] - Connection pool and units of work
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage and engine error types
//! - [`repository`] - Batch store, purchase and sale engines
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pharmstock_core::{Actor, Role};
//! use pharmstock_db::{AppConfig, Database};
//!
//! let config = AppConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let actor = Actor::new("u-42", Role::Pharmacist);
//! let purchase_id = db.purchases().submit(&actor, header, items).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult, InventoryError, InventoryResult};
pub use pool::{Database, DbConfig, UnitOfWork};

pub use repository::batch::BatchRepository;
pub use repository::medicine::MedicineRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::sale::SaleRepository;
pub use repository::supplier::SupplierRepository;

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise engine events are logged at debug
/// and sqlx at warn. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pharmstock_db=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
