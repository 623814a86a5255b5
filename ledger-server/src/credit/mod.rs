//! 赊账应收模块
//!
//! # 模块结构
//!
//! - [`storage`] - redb 存储（销售单、台账、索引）
//! - [`money`] - Decimal 金额计算
//! - [`reducer`] - 派生字段折叠（唯一计算入口）
//! - [`sync`] - 销售单 ↔ 台账同步、补建迁移
//! - [`consistency`] - 对账与修复
//! - [`summary`] - 账龄与汇总看板
//! - [`error`] - 错误类型

pub mod consistency;
pub mod error;
pub mod money;
pub mod reducer;
pub mod storage;
pub mod summary;
pub mod sync;

pub use consistency::ConsistencyChecker;
pub use error::{LedgerError, LedgerResult};
pub use storage::{LedgerStorage, StorageError, StorageResult};
pub use summary::{ReceivableFilter, ReceivableQuery};
pub use sync::{PaymentReceipt, SyncOrchestrator};
