//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts are stored and serialized as `f64` (2 decimal places). Every sum,
//! difference and comparison goes through `Decimal` so that folding a long
//! payment history never accumulates binary floating point drift.

use rust_decimal::prelude::*;

use super::error::{LedgerError, LedgerResult};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed single payment amount (1,000,000)
pub const MAX_PAYMENT_AMOUNT: f64 = 1_000_000.0;

/// Maximum allowed sale total (100,000,000)
pub const MAX_SALE_TOTAL: f64 = 100_000_000.0;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> LedgerResult<()> {
    if !value.is_finite() {
        return Err(LedgerError::InvalidAmount(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Validate a ledger payment amount: finite, strictly positive, bounded
pub fn validate_payment_amount(amount: f64) -> LedgerResult<()> {
    require_finite(amount, "payment amount")?;
    if amount <= 0.0 {
        return Err(LedgerError::InvalidAmount(format!(
            "payment amount must be positive, got {}",
            amount
        )));
    }
    if amount > MAX_PAYMENT_AMOUNT {
        return Err(LedgerError::InvalidAmount(format!(
            "payment amount exceeds maximum allowed ({}), got {}",
            MAX_PAYMENT_AMOUNT, amount
        )));
    }
    Ok(())
}

/// Validate a sale total before it seeds a receivable
pub fn validate_sale_total(total: f64) -> LedgerResult<()> {
    require_finite(total, "sale total")?;
    if total < 0.0 {
        return Err(LedgerError::InvalidAmount(format!(
            "sale total must be non-negative, got {}",
            total
        )));
    }
    if total > MAX_SALE_TOTAL {
        return Err(LedgerError::InvalidAmount(format!(
            "sale total exceeds maximum allowed ({}), got {}",
            MAX_SALE_TOTAL, total
        )));
    }
    Ok(())
}

/// Convert f64 to Decimal for calculation
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Compare two amounts within `MONEY_TOLERANCE`
pub fn money_eq(a: f64, b: f64) -> bool {
    (to_decimal(a) - to_decimal(b)).abs() < MONEY_TOLERANCE
}

/// `part / whole * 100`, rounded to 2 dp; 0 when `whole` is zero
pub fn percentage(part: Decimal, whole: Decimal) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    to_f64(part * Decimal::ONE_HUNDRED / whole)
}
