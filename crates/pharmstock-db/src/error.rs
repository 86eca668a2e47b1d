//! # Database and Engine Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          ValidationError (pharmstock-core) │
//! │       │                                       │                         │
//! │       ▼                                       │                         │
//! │  DbError ← categorized storage failure        │                         │
//! │       │                                       │                         │
//! │       ▼                                       ▼                         │
//! │  InventoryError ← what the engine returns to the HTTP layer            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  code() → "INSUFFICIENT_STOCK", "DUPLICATE_INVOICE", ...              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error raised inside a unit of work propagates with `?`, which drops
//! the transaction and rolls it back before the caller sees the error.

use pharmstock_core::{Capability, Role, ValidationError};
use sqlx::error::ErrorKind;
use thiserror::Error;

// =============================================================================
// DbError
// =============================================================================

/// Storage operation errors.
///
/// These errors wrap sqlx errors and categorize them so the engine can turn
/// constraint failures into domain errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate purchase or sale invoice number
    /// - Any UNIQUE index violation
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a medicine or supplier that doesn't exist
    /// - Deleting a batch still referenced by a sale line
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation, e.g. a batch quantity below zero.
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Begin or commit failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Input rejected before reaching SQLite.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → by ErrorKind (unique / foreign key / check)
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();

                match db_err.kind() {
                    // "UNIQUE constraint failed: <table>.<column>"
                    ErrorKind::UniqueViolation => {
                        let field = msg
                            .split("UNIQUE constraint failed: ")
                            .nth(1)
                            .unwrap_or("unknown")
                            .to_string();
                        DbError::UniqueViolation {
                            field,
                            value: "unknown".to_string(),
                        }
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message: msg },
                    ErrorKind::CheckViolation => DbError::CheckViolation { message: msg },
                    _ => DbError::QueryFailed(msg),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// InventoryError
// =============================================================================

/// Errors returned by the purchase and sale engine.
///
/// The HTTP layer maps [`InventoryError::code`] to its response status.
/// Display messages name the offending entity; raw SQLite text only appears
/// inside `StorageFailure`.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Input rejected before any storage work.
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Invoice number already used by another purchase or sale.
    #[error("Invoice number '{invoice_number}' is already recorded")]
    DuplicateInvoice { invoice_number: String },

    /// A referenced supplier, medicine or batch doesn't exist or doesn't match.
    #[error("Invalid {entity} reference: {id}")]
    InvalidReference { entity: String, id: String },

    /// A batch holds fewer units than a line requested.
    #[error(
        "Insufficient stock for medicine {medicine_id} in batch {batch_id}: \
         available {available}, requested {requested}"
    )]
    InsufficientStock {
        medicine_id: String,
        batch_id: String,
        available: i64,
        requested: i64,
    },

    /// Target of an update doesn't exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The actor's role doesn't grant the capability.
    #[error("Role '{role}' may not {capability}")]
    Forbidden { role: Role, capability: Capability },

    /// Storage failed for a reason the caller can't fix.
    #[error("Storage failure: {0}")]
    StorageFailure(#[source] DbError),
}

impl InventoryError {
    pub fn invalid_reference(entity: impl Into<String>, id: impl Into<String>) -> Self {
        InventoryError::InvalidReference {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        InventoryError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Stable machine-readable code for response mapping.
    pub fn code(&self) -> &'static str {
        match self {
            InventoryError::ValidationFailed(_) => "VALIDATION_FAILED",
            InventoryError::DuplicateInvoice { .. } => "DUPLICATE_INVOICE",
            InventoryError::InvalidReference { .. } => "INVALID_REFERENCE",
            InventoryError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            InventoryError::NotFound { .. } => "NOT_FOUND",
            InventoryError::Forbidden { .. } => "FORBIDDEN",
            InventoryError::StorageFailure(_) => "STORAGE_FAILURE",
        }
    }
}

/// Storage errors with no more specific meaning become `StorageFailure`.
///
/// Callers that know the context (invoice uniqueness, a missing row) map the
/// `DbError` themselves before this conversion applies.
impl From<DbError> for InventoryError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => InventoryError::NotFound { entity, id },
            DbError::Validation(e) => InventoryError::ValidationFailed(e),
            other => InventoryError::StorageFailure(other),
        }
    }
}

impl From<sqlx::Error> for InventoryError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

/// Result type for engine operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

// =============================================================================
// Unit Tests
// =============================================================================
