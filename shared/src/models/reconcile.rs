//! Reconciliation results (一致性校验 / 修复 / 迁移)
//!
//! 批量操作从不因为单条记录失败而中断，每条记录的结果都以数据形式返回。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of drift between a sale and its receivable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyKind {
    /// Credit sale without a receivable
    MissingAccount,
    /// `sale.total` differs from `receivable.original_amount`
    AmountMismatch,
    /// `sale.paid_amount` differs from `receivable.paid_amount`
    PaymentMismatch,
    /// `sale.status` differs from the status implied by the receivable
    StatusMismatch,
}

/// One detected drift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inconsistency {
    pub kind: InconsistencyKind,
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_value: Option<Value>,
    pub message: String,
}

/// One page of a cursor-based validation scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationPage {
    pub inconsistencies: Vec<Inconsistency>,
    /// Pass back to continue; `None` when the scan is complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Number of credit sales examined in this page
    pub scanned: usize,
}

/// What the repairer did for one inconsistency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairAction {
    /// Receivable created for a credit sale that had none
    CreatedAccount,
    /// Sale summary fields overwritten from the receivable
    OrderSynced,
    /// Not auto-fixable, left for operator review
    Skipped,
    /// Repair attempt raised an error
    RepairFailed,
}

/// Outcome of one repair attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairOutcome {
    pub action: RepairAction,
    pub issue: Inconsistency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of `repair(store_id, auto_fix)`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepairReport {
    pub inconsistencies: Vec<Inconsistency>,
    /// Empty when `auto_fix` is false
    pub repairs: Vec<RepairOutcome>,
}

/// Per-sale result of a migration (backfill) pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationResult {
    pub success: bool,
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MigrationResult {
    pub fn ok(order_id: impl Into<String>, ledger_id: impl Into<String>) -> Self {
        Self {
            success: true,
            order_id: order_id.into(),
            ledger_id: Some(ledger_id.into()),
            error: None,
        }
    }

    pub fn failed(order_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            order_id: order_id.into(),
            ledger_id: None,
            error: Some(error.into()),
        }
    }
}
