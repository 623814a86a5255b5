//! Sale Model (销售单)
//!
//! POS 侧的订单记录。对本子系统来说是外部协作者：
//! 赊账建档时读取，付款/状态镜像时写回。`payments` 是旧版的重复付款历史，
//! 为兼容保留；权威数据在应收台账中。

use serde::{Deserialize, Serialize};

use super::receivable::ReceivableStatus;

/// Transaction type of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Cash,
    Credit,
}

/// Legacy settlement status on the sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Paid,
    Unpaid,
}

impl SaleStatus {
    /// 台账状态投影到销售单状态：只有 paid 对应 paid，其余都是 unpaid
    pub fn from_receivable(status: ReceivableStatus) -> Self {
        match status {
            ReceivableStatus::Paid => SaleStatus::Paid,
            _ => SaleStatus::Unpaid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Paid => "paid",
            SaleStatus::Unpaid => "unpaid",
        }
    }
}

/// Legacy payment entry embedded in the sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalePayment {
    /// Payment id; mirrored payments keep the same id on both sides
    #[serde(default)]
    pub id: String,
    pub amount: f64,
    /// Unix millis
    pub date: i64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_by: Option<String>,
}

/// Credit terms attached to a credit sale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditTerms {
    pub credit_days: i64,
    /// Unix millis
    pub due_date: i64,
}

/// Sale (order record)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub store_id: String,
    pub customer_id: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    /// Original amount of the sale
    pub total: f64,
    /// Cached paid amount (mirrors the ledger for credit sales)
    #[serde(default)]
    pub paid_amount: f64,
    pub status: SaleStatus,
    pub transaction_type: TransactionType,
    /// Sale date (Unix millis)
    pub date: i64,
    #[serde(default)]
    pub payments: Vec<SalePayment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_terms: Option<CreditTerms>,
    /// Weak back-reference to the receivable (no ownership)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_id: Option<String>,
}

impl Sale {
    /// 是否赊账销售
    pub fn is_credit(&self) -> bool {
        self.transaction_type == TransactionType::Credit
    }

    /// Find a legacy payment by id
    pub fn find_payment(&self, payment_id: &str) -> Option<&SalePayment> {
        self.payments.iter().find(|p| p.id == payment_id)
    }
}
