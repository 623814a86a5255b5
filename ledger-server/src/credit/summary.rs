//! Aging & Summary Aggregator - 应收账款只读视图
//!
//! [`summarize`] 是纯函数：给定门店全部台账和当前时间，产出看板数据。
//! 未结清台账（非 paid / cancelled）参与合计、状态分布、账龄、欠款排行和即将到期；
//! 回款统计覆盖全部非作废台账。

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::{
    AccountReceivable, AgingBucket, AgingBuckets, CollectionStats, Debtor, PaymentType,
    ReceivableStatus, ReceivableSummary, ReceivableTotals, StatusBreakdown,
};
use shared::util::{DAY_MS, add_days, whole_days_between};

use super::error::{LedgerError, LedgerResult};
use super::money::{percentage, to_decimal, to_f64};
use super::reducer;
use super::storage::LedgerStorage;

/// Number of customers in the debtor ranking
pub const TOP_DEBTORS_LIMIT: usize = 10;

/// Window for upcoming due dates (days)
pub const UPCOMING_DUE_DAYS: i64 = 7;

/// Window for recent collections (days)
pub const COLLECTION_WINDOW_DAYS: i64 = 30;

/// Aging bucket for a receivable at `now`
///
/// Not yet due (`due_date >= now`) is `current`; anything past due falls in
/// `1-30` up to 30 whole days, including the first partial day.
pub fn aging_bucket(due_date: i64, now: i64) -> AgingBucket {
    if due_date >= now {
        return AgingBucket::Current;
    }
    match whole_days_between(due_date, now) {
        ..=30 => AgingBucket::Days1To30,
        31..=60 => AgingBucket::Days31To60,
        61..=90 => AgingBucket::Days61To90,
        _ => AgingBucket::Over90,
    }
}

struct DebtorAcc {
    debtor: Debtor,
    total: Decimal,
}

/// Build the store dashboard from its receivables
pub fn summarize(store_id: &str, ledgers: &[AccountReceivable], now: i64) -> ReceivableSummary {
    let active: Vec<&AccountReceivable> = ledgers
        .iter()
        .filter(|l| l.store_id == store_id && l.status.is_active())
        .collect();

    // ========== Totals / status / aging ==========
    let mut original = Decimal::ZERO;
    let mut paid = Decimal::ZERO;
    let mut remaining = Decimal::ZERO;
    let mut by_status = StatusBreakdown::<usize>::default();
    let mut status_amounts = StatusBreakdown::<Decimal>::default();
    let mut aging = AgingBuckets::<usize>::default();
    let mut aging_amounts = AgingBuckets::<Decimal>::default();

    for ledger in &active {
        let balance = to_decimal(ledger.remaining_balance);
        original += to_decimal(ledger.original_amount);
        paid += to_decimal(ledger.paid_amount);
        remaining += balance;

        let (count, amount) = match reducer::status_at(ledger, now) {
            ReceivableStatus::Pending => (&mut by_status.pending, &mut status_amounts.pending),
            ReceivableStatus::Partial => (&mut by_status.partial, &mut status_amounts.partial),
            ReceivableStatus::Overdue => (&mut by_status.overdue, &mut status_amounts.overdue),
            ReceivableStatus::Paid | ReceivableStatus::Cancelled => continue,
        };
        *count += 1;
        *amount += balance;

        let bucket = aging_bucket(ledger.due_date, now);
        *aging.get_mut(bucket) += 1;
        *aging_amounts.get_mut(bucket) += balance;
    }

    let totals = ReceivableTotals {
        count: active.len(),
        original_amount: to_f64(original),
        paid_amount: to_f64(paid),
        remaining_balance: to_f64(remaining),
    };

    ReceivableSummary {
        store_id: store_id.to_string(),
        totals,
        by_status,
        amounts_by_status: StatusBreakdown {
            pending: to_f64(status_amounts.pending),
            partial: to_f64(status_amounts.partial),
            overdue: to_f64(status_amounts.overdue),
        },
        aging,
        aging_amounts: AgingBuckets {
            current: to_f64(aging_amounts.current),
            days_1_30: to_f64(aging_amounts.days_1_30),
            days_31_60: to_f64(aging_amounts.days_31_60),
            days_61_90: to_f64(aging_amounts.days_61_90),
            over90: to_f64(aging_amounts.over90),
        },
        top_debtors: top_debtors(&active),
        upcoming_due: upcoming_due(&active, now),
        collection_stats: collection_stats(store_id, ledgers, now),
        last_updated: now,
    }
}

/// Customers ranked by summed remaining balance, descending
fn top_debtors(active: &[&AccountReceivable]) -> Vec<Debtor> {
    let mut by_customer: HashMap<&str, DebtorAcc> = HashMap::new();
    for ledger in active {
        let acc = by_customer
            .entry(ledger.customer_id.as_str())
            .or_insert_with(|| DebtorAcc {
                debtor: Debtor {
                    customer_id: ledger.customer_id.clone(),
                    customer_name: ledger.customer_name.clone(),
                    customer_phone: ledger.customer_phone.clone(),
                    total_debt: 0.0,
                    account_count: 0,
                    earliest_due_date: ledger.due_date,
                },
                total: Decimal::ZERO,
            });
        acc.total += to_decimal(ledger.remaining_balance);
        acc.debtor.account_count += 1;
        acc.debtor.earliest_due_date = acc.debtor.earliest_due_date.min(ledger.due_date);
    }

    let mut ranked: Vec<DebtorAcc> = by_customer.into_values().collect();
    // 欠款相同时按客户 ID 排序，保证结果稳定
    ranked.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.debtor.customer_id.cmp(&b.debtor.customer_id))
    });
    ranked
        .into_iter()
        .take(TOP_DEBTORS_LIMIT)
        .map(|acc| Debtor {
            total_debt: to_f64(acc.total),
            ..acc.debtor
        })
        .collect()
}

/// Active receivables due within `[now, now + 7 days]`, soonest first
fn upcoming_due(active: &[&AccountReceivable], now: i64) -> Vec<AccountReceivable> {
    let horizon = add_days(now, UPCOMING_DUE_DAYS);
    let mut due: Vec<AccountReceivable> = active
        .iter()
        .filter(|l| l.due_date >= now && l.due_date <= horizon)
        .map(|l| (*l).clone())
        .collect();
    due.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
    due
}

/// Collection performance over every non-cancelled receivable of the store
fn collection_stats(store_id: &str, ledgers: &[AccountReceivable], now: i64) -> CollectionStats {
    let window_start = now - COLLECTION_WINDOW_DAYS * DAY_MS;
    let mut billed = Decimal::ZERO;
    let mut collected = Decimal::ZERO;
    let mut recent = Decimal::ZERO;
    let mut recent_count = 0;
    let mut fully_paid = 0;

    for ledger in ledgers
        .iter()
        .filter(|l| l.store_id == store_id && l.status != ReceivableStatus::Cancelled)
    {
        billed += to_decimal(ledger.original_amount);
        collected += to_decimal(ledger.paid_amount);
        if ledger.status == ReceivableStatus::Paid {
            fully_paid += 1;
        }
        for payment in ledger.payments.iter().filter(|p| {
            p.payment_type == PaymentType::Payment
                && p.processed_at >= window_start
                && p.processed_at <= now
        }) {
            recent += to_decimal(payment.amount);
            recent_count += 1;
        }
    }

    CollectionStats {
        total_billed: to_f64(billed),
        total_collected: to_f64(collected),
        collection_rate: percentage(collected, billed),
        collected_last_30_days: to_f64(recent),
        payments_last_30_days: recent_count,
        fully_paid_accounts: fully_paid,
    }
}

/// Filter for listing receivables
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceivableFilter {
    #[serde(default)]
    pub status: Option<ReceivableStatus>,
    #[serde(default)]
    pub customer_id: Option<String>,
}

impl ReceivableFilter {
    fn matches(&self, ledger: &AccountReceivable) -> bool {
        self.status.is_none_or(|s| ledger.status == s)
            && self
                .customer_id
                .as_deref()
                .is_none_or(|c| ledger.customer_id == c)
    }
}

/// Read-side queries over the receivable collection
#[derive(Clone)]
pub struct ReceivableQuery {
    storage: LedgerStorage,
}

impl ReceivableQuery {
    pub fn new(storage: LedgerStorage) -> Self {
        Self { storage }
    }

    /// Get a receivable by id, with its status as of `now`
    pub fn get(&self, ledger_id: &str, now: i64) -> LedgerResult<AccountReceivable> {
        let mut ledger = self
            .storage
            .get_ledger(ledger_id)?
            .ok_or_else(|| LedgerError::ReceivableNotFound(ledger_id.to_string()))?;
        ledger.status = reducer::status_at(&ledger, now);
        Ok(ledger)
    }

    /// List a store's receivables, soonest due first
    ///
    /// The status filter applies to the status as of `now`.
    pub fn list(
        &self,
        store_id: &str,
        filter: &ReceivableFilter,
        now: i64,
    ) -> LedgerResult<Vec<AccountReceivable>> {
        let mut ledgers: Vec<AccountReceivable> = self
            .storage
            .list_ledgers(store_id)?
            .into_iter()
            .map(|mut l| {
                l.status = reducer::status_at(&l, now);
                l
            })
            .filter(|l| filter.matches(l))
            .collect();
        ledgers.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
        Ok(ledgers)
    }

    /// Dashboard summary for a store
    pub fn summary(&self, store_id: &str, now: i64) -> LedgerResult<ReceivableSummary> {
        let ledgers = self.storage.list_ledgers(store_id)?;
        Ok(summarize(store_id, &ledgers, now))
    }
}
