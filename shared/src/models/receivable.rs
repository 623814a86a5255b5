//! Account Receivable Model (应收账款台账)
//!
//! 每笔赊账销售对应唯一一个台账。付款记录只追加不修改，
//! `paid_amount` / `remaining_balance` / `status` / `last_payment_date`
//! 是派生字段，由 ledger-server 的 reducer 在每次追加后物化，调用方不能直接设置。

use serde::{Deserialize, Serialize};

/// Receivable status (derived, never set directly except `Cancelled`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceivableStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
    /// 终态，只能显式设置，不会被推导出来
    Cancelled,
}

impl ReceivableStatus {
    /// Active = still carries collectible debt
    pub fn is_active(&self) -> bool {
        !matches!(self, ReceivableStatus::Paid | ReceivableStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReceivableStatus::Pending => "pending",
            ReceivableStatus::Partial => "partial",
            ReceivableStatus::Paid => "paid",
            ReceivableStatus::Overdue => "overdue",
            ReceivableStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ReceivableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    #[default]
    Payment,
    Adjustment,
    Discount,
    Refund,
}

impl PaymentType {
    /// Refunds reduce the paid amount, every other kind increases it
    pub fn is_refund(&self) -> bool {
        matches!(self, PaymentType::Refund)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Payment => "payment",
            PaymentType::Adjustment => "adjustment",
            PaymentType::Discount => "discount",
            PaymentType::Refund => "refund",
        }
    }
}

/// Append-only ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivablePayment {
    pub id: String,
    /// Always positive; the sign comes from `payment_type`
    pub amount: f64,
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", default)]
    pub payment_type: PaymentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<String>,
    /// Unix millis
    pub processed_at: i64,
}

/// Account receivable (ledger entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountReceivable {
    pub id: String,
    /// Unique: one receivable per credit sale
    pub order_id: String,
    pub store_id: String,
    pub customer_id: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    pub original_amount: f64,
    /// Derived
    pub paid_amount: f64,
    /// Derived
    pub remaining_balance: f64,
    /// Unix millis
    pub sale_date: i64,
    /// Unix millis
    pub due_date: i64,
    /// Derived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_payment_date: Option<i64>,
    /// Derived
    pub status: ReceivableStatus,
    #[serde(default)]
    pub payments: Vec<ReceivablePayment>,
    pub credit_days: i64,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Optimistic concurrency stamp, incremented on every persisted write
    pub version: u64,
}

impl AccountReceivable {
    pub fn has_payment(&self, payment_id: &str) -> bool {
        self.payments.iter().any(|p| p.id == payment_id)
    }

    /// Newest entry by processing time (ties resolved by append order)
    pub fn latest_payment(&self) -> Option<&ReceivablePayment> {
        self.payments
            .iter()
            .enumerate()
            .max_by_key(|(idx, p)| (p.processed_at, *idx))
            .map(|(_, p)| p)
    }
}

/// Ledger-side payment request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInput {
    /// Client-supplied id for idempotent retries; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub amount: f64,
    pub payment_method: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(rename = "type", default)]
    pub payment_type: PaymentType,
    #[serde(default)]
    pub notes: Option<String>,
}
