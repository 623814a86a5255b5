//! Receivable Reducer - 派生字段的唯一计算入口
//!
//! 台账的 `paid_amount` / `remaining_balance` / `status` / `last_payment_date`
//! 全部由 [`derive`] 从完整付款序列折叠得出，每次追加后物化写回。
//!
//! ```text
//! payments ──fold(processed_at order)──▶ paid ──▶ remaining ──▶ status
//! ```
//!
//! - `payment` / `adjustment` / `discount` 累加，`refund` 扣减
//! - 最终结果在 0 处截断，永不为负
//! - `cancelled` 是显式终态，不会被推导覆盖

use rust_decimal::Decimal;
use shared::models::{AccountReceivable, PaymentType, ReceivablePayment, ReceivableStatus};

use super::error::{LedgerError, LedgerResult};
use super::money::{self, to_decimal, to_f64};

/// Derived fields of a receivable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derived {
    pub paid_amount: f64,
    pub remaining_balance: f64,
    pub status: ReceivableStatus,
    pub last_payment_date: Option<i64>,
}

/// Fold a payment sequence into the derived fields
pub fn derive(
    original_amount: f64,
    payments: &[ReceivablePayment],
    due_date: i64,
    current_status: ReceivableStatus,
    now: i64,
) -> Derived {
    let mut ordered: Vec<&ReceivablePayment> = payments.iter().collect();
    ordered.sort_by_key(|p| p.processed_at);

    let net = ordered.iter().fold(Decimal::ZERO, |acc, p| {
        let amount = to_decimal(p.amount);
        if p.payment_type.is_refund() {
            acc - amount
        } else {
            acc + amount
        }
    });
    let paid = net.max(Decimal::ZERO);
    let remaining = (to_decimal(original_amount) - paid).max(Decimal::ZERO);

    let paid_amount = to_f64(paid);
    let remaining_balance = to_f64(remaining);

    let status = if current_status == ReceivableStatus::Cancelled {
        ReceivableStatus::Cancelled
    } else if remaining_balance <= 0.0 {
        ReceivableStatus::Paid
    } else if paid_amount > 0.0 {
        ReceivableStatus::Partial
    } else if now > due_date {
        ReceivableStatus::Overdue
    } else {
        ReceivableStatus::Pending
    };

    let last_payment_date = ordered
        .iter()
        .filter(|p| p.payment_type == PaymentType::Payment)
        .map(|p| p.processed_at)
        .max();

    Derived {
        paid_amount,
        remaining_balance,
        status,
        last_payment_date,
    }
}

/// Recompute and materialize the derived fields in place
pub fn recompute_derived(ledger: &mut AccountReceivable, now: i64) {
    let derived = derive(
        ledger.original_amount,
        &ledger.payments,
        ledger.due_date,
        ledger.status,
        now,
    );
    ledger.paid_amount = derived.paid_amount;
    ledger.remaining_balance = derived.remaining_balance;
    ledger.status = derived.status;
    ledger.last_payment_date = derived.last_payment_date;
}

/// Status of a stored receivable as of `now`
///
/// Only `pending` moves with time alone: once the due date passes it reads
/// as `overdue` until the next write or overdue sweep materializes it.
pub fn status_at(ledger: &AccountReceivable, now: i64) -> ReceivableStatus {
    match ledger.status {
        ReceivableStatus::Pending if now > ledger.due_date => ReceivableStatus::Overdue,
        status => status,
    }
}

/// Append one payment record and recompute
///
/// The only mutation path for a receivable's payment history.
pub fn append_payment(
    ledger: &mut AccountReceivable,
    record: ReceivablePayment,
    now: i64,
) -> LedgerResult<()> {
    money::validate_payment_amount(record.amount)?;
    if ledger.status == ReceivableStatus::Cancelled {
        return Err(LedgerError::ReceivableCancelled(ledger.id.clone()));
    }
    if record.id.is_empty() {
        return Err(LedgerError::Validation("payment id must not be empty".into()));
    }
    if ledger.has_payment(&record.id) {
        return Err(LedgerError::DuplicatePayment {
            ledger_id: ledger.id.clone(),
            payment_id: record.id,
        });
    }

    ledger.payments.push(record);
    recompute_derived(ledger, now);
    ledger.updated_at = now;
    Ok(())
}
