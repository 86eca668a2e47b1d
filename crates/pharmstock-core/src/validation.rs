//! # Validation Module
//!
//! Fail-fast input checks for purchase and sale submissions.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP layer                                                   │
//! │  └── JSON shape (deserialization into NewPurchase / NewSale)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any unit of work opens)                  │
//! │  ├── required fields, quantities in 1..=MAX_LINE_QUANTITY             │
//! │  ├── non-negative prices, line totals / markups that fit in i64        │
//! │  └── manufacture date not after expiry date                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine + SQLite (inside the unit of work)                    │
//! │  ├── referenced supplier / medicine / batch exist                      │
//! │  ├── UNIQUE invoice numbers, UNIQUE (medicine, batch_number)           │
//! │  └── CHECK (quantity >= 0, integer) on batches                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field paths in errors point at the offending input, e.g. `items[2].quantity`.
//!
//! ## Usage
//! ```rust
//! use pharmstock_core::validation::{validate_invoice_number, validate_quantity};
//!
//! assert_eq!(validate_invoice_number("invoice_number", " PO-1001 ").unwrap(), "PO-1001");
//! assert!(validate_quantity("items[0].quantity", 0).is_err());
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::types::{NewPurchase, NewPurchaseItem, NewSale, NewSaleItem};
use crate::{MAX_LINE_ITEMS, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_INVOICE_LEN: usize = 50;
const MAX_BATCH_NUMBER_LEN: usize = 50;
const MAX_ID_LEN: usize = 64;
const MAX_NAME_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

fn required<'a>(field: &str, value: &'a str, max: usize) -> ValidationResult<&'a str> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value)
}

/// Validates an invoice number.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 50 characters
///
/// ## Returns
/// The trimmed invoice number.
pub fn validate_invoice_number(field: &str, invoice: &str) -> ValidationResult<String> {
    required(field, invoice, MAX_INVOICE_LEN).map(str::to_string)
}

/// Validates a supplier batch number.
///
/// Batch numbers are printed on packaging and vary by manufacturer, so only
/// presence and length are checked.
///
/// ## Example
/// ```rust
/// use pharmstock_core::validation::validate_batch_number;
///
/// assert!(validate_batch_number("batch_number", "LOT/2025-07 A").is_ok());
/// assert!(validate_batch_number("batch_number", "  ").is_err());
/// ```
pub fn validate_batch_number(field: &str, batch_number: &str) -> ValidationResult<String> {
    required(field, batch_number, MAX_BATCH_NUMBER_LEN).map(str::to_string)
}

/// Validates a display name (medicine, supplier).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    required(field, name, MAX_NAME_LEN).map(str::to_string)
}

/// Validates that a reference id is present.
///
/// Existence is checked later, inside the unit of work.
pub fn validate_reference_id(field: &str, id: &str) -> ValidationResult<()> {
    required(field, id, MAX_ID_LEN).map(|_| ())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - At most MAX_LINE_QUANTITY (1,000,000)
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free samples, zero tax)
///
/// ## Example
/// ```rust
/// use pharmstock_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("unit_price_cents", 1099).is_ok());
/// assert!(validate_amount_cents("unit_price_cents", 0).is_ok());
/// assert!(validate_amount_cents("unit_price_cents", -100).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates that `earlier` is not after `later` when both are known.
pub fn validate_date_order(
    earlier_field: &str,
    earlier: Option<NaiveDate>,
    later_field: &str,
    later: NaiveDate,
) -> ValidationResult<()> {
    match earlier {
        Some(date) if date > later => Err(ValidationError::DateOrder {
            earlier: earlier_field.to_string(),
            later: later_field.to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of line items in a submission.
///
/// ## Rules
/// - At least one line item
/// - At most MAX_LINE_ITEMS (500)
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    if count > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    Ok(())
}

/// Rejects a derived amount that left the i64 range.
fn validate_resolved(field: &str, resolved: Option<i64>) -> ValidationResult<()> {
    match resolved {
        Some(_) => Ok(()),
        None => Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        }),
    }
}

fn validate_header_amounts(
    total_cents: i64,
    tax_cents: i64,
    discount_cents: i64,
    net_cents: i64,
) -> ValidationResult<()> {
    validate_amount_cents("total_cents", total_cents)?;
    validate_amount_cents("tax_cents", tax_cents)?;
    validate_amount_cents("discount_cents", discount_cents)?;
    validate_amount_cents("net_cents", net_cents)
}

// =============================================================================
// Submission Validators
// =============================================================================

/// Validates a purchase submission before any storage work.
///
/// ## Checks
/// ```text
/// items:    1..=500 lines
/// header:   invoice_number, supplier_id present; amounts ≥ 0
/// per line: medicine_id, batch_number, expiry_date present
///           quantity in 1..=1,000,000; unit/total/selling price ≥ 0
///           defaulted total and selling price (at `markup_bps`) fit in i64
///           manufacture_date ≤ expiry_date
/// ```
pub fn validate_new_purchase(
    purchase: &NewPurchase,
    items: &[NewPurchaseItem],
    markup_bps: u32,
) -> ValidationResult<()> {
    validate_line_count(items.len())?;
    validate_invoice_number("invoice_number", &purchase.invoice_number)?;
    validate_reference_id("supplier_id", &purchase.supplier_id)?;
    validate_header_amounts(
        purchase.total_cents,
        purchase.tax_cents,
        purchase.discount_cents,
        purchase.net_cents,
    )?;

    for (i, item) in items.iter().enumerate() {
        let path = |name: &str| format!("items[{}].{}", i, name);

        validate_reference_id(&path("medicine_id"), &item.medicine_id)?;
        validate_batch_number(&path("batch_number"), &item.batch_number)?;
        validate_quantity(&path("quantity"), item.quantity)?;
        validate_amount_cents(&path("unit_price_cents"), item.unit_price_cents)?;
        if let Some(total) = item.total_price_cents {
            validate_amount_cents(&path("total_price_cents"), total)?;
        }
        if let Some(price) = item.selling_price_cents {
            validate_amount_cents(&path("selling_price_cents"), price)?;
        }
        validate_resolved(&path("total_price_cents"), item.resolved_total_cents())?;
        validate_resolved(
            &path("selling_price_cents"),
            item.resolved_selling_price_cents(markup_bps),
        )?;

        let expiry = item.expiry_date.ok_or_else(|| ValidationError::Required {
            field: path("expiry_date"),
        })?;
        validate_date_order(
            &path("manufacture_date"),
            item.manufacture_date,
            &path("expiry_date"),
            expiry,
        )?;
    }

    Ok(())
}

/// Validates a sale submission before any storage work.
///
/// Stock availability is not checked here; it depends on concurrent
/// activity and is decided inside the unit of work.
pub fn validate_new_sale(sale: &NewSale, items: &[NewSaleItem]) -> ValidationResult<()> {
    validate_line_count(items.len())?;
    validate_invoice_number("invoice_number", &sale.invoice_number)?;
    validate_header_amounts(
        sale.total_cents,
        sale.tax_cents,
        sale.discount_cents,
        sale.net_cents,
    )?;

    for (i, item) in items.iter().enumerate() {
        let path = |name: &str| format!("items[{}].{}", i, name);

        validate_reference_id(&path("medicine_id"), &item.medicine_id)?;
        validate_reference_id(&path("batch_id"), &item.batch_id)?;
        validate_quantity(&path("quantity"), item.quantity)?;
        validate_amount_cents(&path("unit_price_cents"), item.unit_price_cents)?;
        if let Some(total) = item.total_price_cents {
            validate_amount_cents(&path("total_price_cents"), total)?;
        }
        validate_resolved(&path("total_price_cents"), item.resolved_total_cents())?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, PaymentStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn purchase() -> NewPurchase {
        NewPurchase {
            invoice_number: "PO-1".into(),
            supplier_id: "s-1".into(),
            purchase_date: date(2025, 1, 10),
            total_cents: 1000,
            tax_cents: 0,
            discount_cents: 0,
            net_cents: 1000,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            notes: None,
        }
    }

    fn purchase_item() -> NewPurchaseItem {
        NewPurchaseItem {
            medicine_id: "m-1".into(),
            batch_number: "B1".into(),
            quantity: 10,
            unit_price_cents: 100,
            expiry_date: Some(date(2027, 1, 1)),
            ..Default::default()
        }
    }

    fn sale() -> NewSale {
        NewSale {
            invoice_number: "S-1".into(),
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            sale_date: None,
            total_cents: 260,
            tax_cents: 0,
            discount_cents: 0,
            net_cents: 260,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Paid,
            prescription_number: None,
            notes: None,
        }
    }

    fn sale_item() -> NewSaleItem {
        NewSaleItem {
            medicine_id: "m-1".into(),
            batch_id: "b-1".into(),
            quantity: 2,
            unit_price_cents: 130,
            total_price_cents: None,
        }
    }

    #[test]
    fn test_validate_invoice_number() {
        assert_eq!(validate_invoice_number("invoice_number", "INV-7").unwrap(), "INV-7");
        assert!(validate_invoice_number("invoice_number", "").is_err());
        assert!(validate_invoice_number("invoice_number", "   ").is_err());
        assert!(validate_invoice_number("invoice_number", &"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", " Paracetamol ").unwrap(), "Paracetamol");
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", &"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity("quantity", 1).is_ok());
        assert!(validate_quantity("quantity", MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity("quantity", 0).is_err());
        assert!(validate_quantity("quantity", -5).is_err());
        assert_eq!(
            validate_quantity("quantity", MAX_LINE_QUANTITY + 1).unwrap_err(),
            ValidationError::OutOfRange {
                field: "quantity".into(),
                min: 1,
                max: MAX_LINE_QUANTITY,
            }
        );
    }

    #[test]
    fn test_validate_date_order() {
        let expiry = date(2026, 1, 1);
        assert!(validate_date_order("mfg", None, "exp", expiry).is_ok());
        assert!(validate_date_order("mfg", Some(expiry), "exp", expiry).is_ok());
        assert!(validate_date_order("mfg", Some(date(2026, 1, 2)), "exp", expiry).is_err());
    }

    #[test]
    fn test_valid_purchase() {
        assert!(validate_new_purchase(&purchase(), &[purchase_item()], 3000).is_ok());
    }

    #[test]
    fn test_purchase_without_items() {
        let err = validate_new_purchase(&purchase(), &[], 3000).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "items".into() });
    }

    #[test]
    fn test_purchase_missing_supplier() {
        let header = NewPurchase {
            supplier_id: " ".into(),
            ..purchase()
        };
        let err = validate_new_purchase(&header, &[purchase_item()], 3000).unwrap_err();
        assert_eq!(err.field(), "supplier_id");
    }

    #[test]
    fn test_purchase_item_paths() {
        let bad_qty = NewPurchaseItem {
            quantity: 0,
            ..purchase_item()
        };
        let err = validate_new_purchase(&purchase(), &[purchase_item(), bad_qty], 3000).unwrap_err();
        assert_eq!(err.field(), "items[1].quantity");

        let no_expiry = NewPurchaseItem {
            expiry_date: None,
            ..purchase_item()
        };
        let err = validate_new_purchase(&purchase(), &[no_expiry], 3000).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Required {
                field: "items[0].expiry_date".into()
            }
        );
    }

    #[test]
    fn test_purchase_manufacture_after_expiry() {
        let item = NewPurchaseItem {
            manufacture_date: Some(date(2028, 1, 1)),
            ..purchase_item()
        };
        let err = validate_new_purchase(&purchase(), &[item], 3000).unwrap_err();
        assert!(matches!(err, ValidationError::DateOrder { .. }));
    }

    #[test]
    fn test_purchase_negative_selling_price() {
        let item = NewPurchaseItem {
            selling_price_cents: Some(-1),
            ..purchase_item()
        };
        let err = validate_new_purchase(&purchase(), &[item], 3000).unwrap_err();
        assert_eq!(err.field(), "items[0].selling_price_cents");
    }

    #[test]
    fn test_purchase_huge_quantity() {
        let item = NewPurchaseItem {
            quantity: i64::MAX - 1,
            ..purchase_item()
        };
        let err = validate_new_purchase(&purchase(), &[item], 3000).unwrap_err();
        assert_eq!(err.field(), "items[0].quantity");
    }

    #[test]
    fn test_purchase_line_total_overflow() {
        let item = NewPurchaseItem {
            quantity: 3,
            unit_price_cents: i64::MAX / 2,
            selling_price_cents: Some(100),
            ..purchase_item()
        };
        let err = validate_new_purchase(&purchase(), &[item.clone()], 3000).unwrap_err();
        assert_eq!(err.field(), "items[0].total_price_cents");

        // A caller-supplied total doesn't need the product
        let explicit = NewPurchaseItem {
            total_price_cents: Some(1_000),
            ..item
        };
        assert!(validate_new_purchase(&purchase(), &[explicit], 3000).is_ok());
    }

    #[test]
    fn test_purchase_markup_overflow() {
        let item = NewPurchaseItem {
            quantity: 1,
            unit_price_cents: i64::MAX - 10,
            ..purchase_item()
        };
        let err = validate_new_purchase(&purchase(), &[item.clone()], 3000).unwrap_err();
        assert_eq!(err.field(), "items[0].selling_price_cents");

        // Fine without markup, or with an explicit selling price
        assert!(validate_new_purchase(&purchase(), &[item.clone()], 0).is_ok());
        let priced = NewPurchaseItem {
            selling_price_cents: Some(500),
            ..item
        };
        assert!(validate_new_purchase(&purchase(), &[priced], 3000).is_ok());
    }

    #[test]
    fn test_sale_line_total_overflow() {
        let item = NewSaleItem {
            quantity: 3,
            unit_price_cents: i64::MAX / 2,
            ..sale_item()
        };
        let err = validate_new_sale(&sale(), &[item]).unwrap_err();
        assert_eq!(err.field(), "items[0].total_price_cents");

        let huge = NewSaleItem {
            quantity: MAX_LINE_QUANTITY + 1,
            ..sale_item()
        };
        let err = validate_new_sale(&sale(), &[huge]).unwrap_err();
        assert_eq!(err.field(), "items[0].quantity");
    }

    #[test]
    fn test_valid_sale() {
        assert!(validate_new_sale(&sale(), &[sale_item()]).is_ok());
    }

    #[test]
    fn test_sale_requires_batch() {
        let item = NewSaleItem {
            batch_id: String::new(),
            ..sale_item()
        };
        let err = validate_new_sale(&sale(), &[item]).unwrap_err();
        assert_eq!(err.field(), "items[0].batch_id");
    }

    #[test]
    fn test_sale_empty_invoice() {
        let header = NewSale {
            invoice_number: String::new(),
            ..sale()
        };
        let err = validate_new_sale(&header, &[sale_item()]).unwrap_err();
        assert_eq!(err.field(), "invoice_number");
    }

    #[test]
    fn test_line_count_limit() {
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(MAX_LINE_ITEMS).is_ok());
        assert!(validate_line_count(MAX_LINE_ITEMS + 1).is_err());
    }
}
