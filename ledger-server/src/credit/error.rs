use super::storage::StorageError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    #[error("Receivable not found: {0}")]
    ReceivableNotFound(String),

    /// InvalidState: the sale is not a credit sale
    #[error("Sale is not a credit sale: {0}")]
    NotCreditSale(String),

    /// InvalidState: the receivable is cancelled (terminal)
    #[error("Receivable is cancelled: {0}")]
    ReceivableCancelled(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Duplicate payment {payment_id} on receivable {ledger_id}")]
    DuplicatePayment {
        ledger_id: String,
        payment_id: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Version conflict on receivable {id}: expected {expected}, found {found}")]
    VersionConflict { id: String, expected: u64, found: u64 },

    #[error("Concurrent modification: {0}")]
    Conflict(String),
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::VersionMismatch {
                id,
                expected,
                found,
            } => LedgerError::VersionConflict {
                id,
                expected,
                found,
            },
            StorageError::ReceivableNotFound(id) => LedgerError::ReceivableNotFound(id),
            other => LedgerError::Storage(other),
        }
    }
}

impl From<redb::CommitError> for LedgerError {
    fn from(err: redb::CommitError) -> Self {
        LedgerError::Storage(StorageError::Commit(err))
    }
}

impl LedgerError {
    /// Whether a fresh read-reduce-commit cycle may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::VersionConflict { .. })
    }
}

/// 将存储错误转换为错误码
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    match e {
        StorageError::Serialization(_) => return ErrorCode::InternalError,
        StorageError::VersionMismatch { .. } | StorageError::DuplicateOrder { .. } => {
            return ErrorCode::ReceivableVersionConflict;
        }
        StorageError::ReceivableNotFound(_) => return ErrorCode::ReceivableNotFound,
        _ => {}
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();

    // 磁盘空间不足
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    // 数据损坏
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    // 默认：系统繁忙（redb 的 Database/Transaction/Table/Storage/Commit 错误）
    ErrorCode::SystemBusy
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                AppError::with_message(code, e.to_string())
            }
            LedgerError::SaleNotFound(id) => {
                AppError::with_message(ErrorCode::SaleNotFound, format!("Sale not found: {}", id))
                    .with_detail("order_id", id)
            }
            LedgerError::ReceivableNotFound(id) => AppError::with_message(
                ErrorCode::ReceivableNotFound,
                format!("Receivable not found: {}", id),
            )
            .with_detail("ledger_id", id),
            LedgerError::NotCreditSale(id) => AppError::with_message(
                ErrorCode::SaleNotCredit,
                format!("Sale is not a credit sale: {}", id),
            )
            .with_detail("order_id", id),
            LedgerError::ReceivableCancelled(id) => AppError::with_message(
                ErrorCode::ReceivableCancelled,
                format!("Receivable is cancelled: {}", id),
            )
            .with_detail("ledger_id", id),
            LedgerError::InvalidAmount(msg) => {
                AppError::with_message(ErrorCode::PaymentInvalidAmount, msg)
            }
            LedgerError::DuplicatePayment {
                ledger_id,
                payment_id,
            } => AppError::with_message(
                ErrorCode::PaymentDuplicate,
                format!("Payment {} already recorded", payment_id),
            )
            .with_detail("ledger_id", ledger_id)
            .with_detail("payment_id", payment_id),
            LedgerError::Validation(msg) => AppError::validation(msg),
            err @ LedgerError::VersionConflict { .. } => {
                AppError::with_message(ErrorCode::ReceivableVersionConflict, err.to_string())
            }
            LedgerError::Conflict(msg) => {
                AppError::with_message(ErrorCode::ReceivableVersionConflict, msg)
            }
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
