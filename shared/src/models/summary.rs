//! Receivable Summary (应收账款汇总 / 账龄分析)
//!
//! 只读视图，由 ledger-server 从台账集合计算得出。

use serde::{Deserialize, Serialize};

use super::receivable::AccountReceivable;

/// Aging bucket by whole days past due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgingBucket {
    #[serde(rename = "current")]
    Current,
    #[serde(rename = "1-30")]
    Days1To30,
    #[serde(rename = "31-60")]
    Days31To60,
    #[serde(rename = "61-90")]
    Days61To90,
    #[serde(rename = "over90")]
    Over90,
}

/// One value per aging bucket (counts or amounts)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AgingBuckets<T> {
    pub current: T,
    #[serde(rename = "1-30")]
    pub days_1_30: T,
    #[serde(rename = "31-60")]
    pub days_31_60: T,
    #[serde(rename = "61-90")]
    pub days_61_90: T,
    pub over90: T,
}

impl<T> AgingBuckets<T> {
    pub fn get_mut(&mut self, bucket: AgingBucket) -> &mut T {
        match bucket {
            AgingBucket::Current => &mut self.current,
            AgingBucket::Days1To30 => &mut self.days_1_30,
            AgingBucket::Days31To60 => &mut self.days_31_60,
            AgingBucket::Days61To90 => &mut self.days_61_90,
            AgingBucket::Over90 => &mut self.over90,
        }
    }
}

/// Per-status breakdown over active statuses
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusBreakdown<T> {
    pub pending: T,
    pub partial: T,
    pub overdue: T,
}

/// Totals over active receivables
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceivableTotals {
    pub count: usize,
    pub original_amount: f64,
    pub paid_amount: f64,
    pub remaining_balance: f64,
}

/// Customer ranked by outstanding debt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debtor {
    pub customer_id: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    pub total_debt: f64,
    pub account_count: usize,
    pub earliest_due_date: i64,
}

/// Collection performance over all non-cancelled receivables
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_billed: f64,
    pub total_collected: f64,
    /// Percentage, 2 dp
    pub collection_rate: f64,
    pub collected_last_30_days: f64,
    pub payments_last_30_days: usize,
    pub fully_paid_accounts: usize,
}

/// Dashboard view for one store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivableSummary {
    pub store_id: String,
    pub totals: ReceivableTotals,
    pub by_status: StatusBreakdown<usize>,
    pub amounts_by_status: StatusBreakdown<f64>,
    pub aging: AgingBuckets<usize>,
    pub aging_amounts: AgingBuckets<f64>,
    pub top_debtors: Vec<Debtor>,
    pub upcoming_due: Vec<AccountReceivable>,
    pub collection_stats: CollectionStats,
    pub last_updated: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aging_bucket_keys() {
        let mut buckets = AgingBuckets::<usize>::default();
        *buckets.get_mut(AgingBucket::Days31To60) += 2;
        *buckets.get_mut(AgingBucket::Over90) += 1;

        let json = serde_json::to_value(buckets).unwrap();
        assert_eq!(json["31-60"], 2);
        assert_eq!(json["over90"], 1);
        assert_eq!(json["current"], 0);
    }

    #[test]
    fn test_bucket_enum_wire_name() {
        let json = serde_json::to_string(&AgingBucket::Days1To30).unwrap();
        assert_eq!(json, "\"1-30\"");
    }
}
