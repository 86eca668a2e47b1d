//! # pharmstock-core: Pure Domain Logic for PharmStock
//!
//! Everything the inventory engine needs to know about medicines, batches,
//! purchases and sales that does not touch storage.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PharmStock Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              HTTP layer (external collaborator)                 │   │
//! │  │   authenticates, parses JSON, hands over Actor + header + items │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ pharmstock-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   auth    │  │ validation│  │   │
//! │  │   │  Batch    │  │   Money   │  │   Actor   │  │  invoices │  │   │
//! │  │   │ Purchase  │  │  markup   │  │   Role    │  │  items    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 pharmstock-db (transaction engine)              │   │
//! │  │        SQLite, unit of work, batch store, purchases, sales      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Medicine, Batch, Purchase, Sale, ...)
//! - [`money`] - Money type with overflow-checked arithmetic
//! - [`auth`] - Authenticated actor and role capabilities
//! - [`error`] - Domain error types
//! - [`validation`] - Fail-fast checks run before any unit of work opens
//!
//! ## Example Usage
//!
//! ```rust
//! use pharmstock_core::money::Money;
//!
//! // Unit cost $4.00 with the default 30% markup
//! let cost = Money::from_cents(400);
//! assert_eq!(cost.apply_markup(3000), Some(Money::from_cents(520)));
//! ```

pub mod auth;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

pub use auth::{Actor, Capability, Role};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

/// Markup applied to unit cost when a purchase line carries no selling price.
///
/// 3000 bps = 30%, so a batch bought at $1.00 is priced at $1.30.
pub const DEFAULT_MARKUP_BPS: u32 = 3000;

/// Reorder threshold given to medicines that don't specify one.
pub const DEFAULT_REORDER_LEVEL: i64 = 10;

/// Maximum line items accepted in a single purchase or sale.
pub const MAX_LINE_ITEMS: usize = 500;

/// Maximum quantity accepted on a single purchase or sale line.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;
