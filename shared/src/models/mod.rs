//! Credit ledger data models
//!
//! - [`sale`] - 销售单（POS 侧，外部系统的订单记录）
//! - [`receivable`] - 应收账款台账（赊账销售的唯一事实来源）
//! - [`reconcile`] - 一致性校验 / 修复 / 迁移结果
//! - [`summary`] - 应收汇总读模型（账龄、欠款客户、即将到期）

pub mod receivable;
pub mod reconcile;
pub mod sale;
pub mod summary;

pub use receivable::{AccountReceivable, PaymentInput, PaymentType, ReceivablePayment, ReceivableStatus};
pub use reconcile::{
    Inconsistency, InconsistencyKind, MigrationResult, RepairAction, RepairOutcome, RepairReport,
    ValidationPage,
};
pub use sale::{CreditTerms, Sale, SalePayment, SaleStatus, TransactionType};
pub use summary::{
    AgingBucket, AgingBuckets, CollectionStats, Debtor, ReceivableSummary, ReceivableTotals,
    StatusBreakdown,
};
