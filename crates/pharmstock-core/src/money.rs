//! # Money Module
//!
//! Provides the `Money` type for unit costs, selling prices and invoice totals.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Supplier invoices are reconciled to the cent.                          │
//! │                                                                         │
//! │  Floating point:  0.1 + 0.2 = 0.30000000000000004                      │
//! │  Integer cents:   10 + 20  = 30                                         │
//! │                                                                         │
//! │  Every *_cents column in the schema is an i64 in minor units.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pharmstock_core::money::Money;
//!
//! let unit_cost = Money::from_cents(250); // $2.50
//! let line_total = unit_cost.checked_line_total(12);
//! assert_eq!(line_total, Some(Money::from_cents(3000)));
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use pharmstock_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Multiplies by a line quantity, returning `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use pharmstock_core::money::Money;
    ///
    /// let unit = Money::from_cents(299);
    /// assert_eq!(unit.checked_line_total(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_line_total(2), None);
    /// ```
    #[inline]
    pub fn checked_line_total(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Adds a markup expressed in basis points, rounding half up.
    ///
    /// Returns `None` when the marked-up price doesn't fit in an i64.
    ///
    /// ## Implementation
    /// Integer math on i128: `amount + (amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use pharmstock_core::money::Money;
    ///
    /// // $0.99 at 30% markup = $1.287 → $1.29
    /// assert_eq!(Money::from_cents(99).apply_markup(3000), Some(Money::from_cents(129)));
    /// assert_eq!(Money::from_cents(i64::MAX - 10).apply_markup(3000), None);
    /// ```
    pub fn apply_markup(&self, markup_bps: u32) -> Option<Money> {
        let markup = (self.0 as i128 * markup_bps as i128 + 5000) / 10000;
        let markup = i64::try_from(markup).ok()?;
        self.0.checked_add(markup).map(Money)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
    }

    #[test]
    fn test_markup_rounding() {
        // $1.00 at 30% = $1.30 exactly
        assert_eq!(Money::from_cents(100).apply_markup(3000), Some(Money::from_cents(130)));
        // $0.05 at 30% = $0.065 → $0.07 (half up)
        assert_eq!(Money::from_cents(5).apply_markup(3000), Some(Money::from_cents(7)));
        // zero markup keeps the cost
        assert_eq!(Money::from_cents(421).apply_markup(0), Some(Money::from_cents(421)));
    }

    #[test]
    fn test_markup_overflow() {
        assert!(Money::from_cents(i64::MAX - 10).apply_markup(3000).is_none());
        assert!(Money::from_cents(i64::MAX).apply_markup(1).is_none());
        // the markup itself leaves i64 range before the sum does
        assert!(Money::from_cents(i64::MAX / 2).apply_markup(u32::MAX).is_none());
        assert_eq!(
            Money::from_cents(i64::MAX).apply_markup(0),
            Some(Money::from_cents(i64::MAX))
        );
    }

    #[test]
    fn test_checked_line_total() {
        assert_eq!(
            Money::from_cents(250).checked_line_total(4),
            Some(Money::from_cents(1000))
        );
        assert!(Money::from_cents(i64::MAX / 2 + 1).checked_line_total(2).is_none());
    }
}
