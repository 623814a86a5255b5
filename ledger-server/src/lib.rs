//! Ledger Server - 赊账销售应收台账服务
//!
//! # 架构概述
//!
//! 每笔赊账销售在两处留有记录：POS 侧的销售单，以及本服务维护的应收台账。
//! 台账是唯一事实来源，销售单上的已付金额与状态只是它的投影。
//!
//! - **存储** (`credit::storage`): 嵌入式 redb，销售单与台账同库
//! - **折叠** (`credit::reducer`): 余额与状态只由付款流水计算
//! - **同步** (`credit::sync`): 建档、双向付款同步、历史补建
//! - **对账** (`credit::consistency`): 分页校验与修复
//! - **HTTP API** (`api`): RESTful 接口
//!
//! # 模块结构
//!
//! ```text
//! ledger-server/src/
//! ├── core/          # 配置、状态、错误、服务器
//! ├── credit/        # 台账领域逻辑
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志、错误类型 re-export
//! ```

pub mod api;
pub mod core;
pub mod credit;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerError, ServerState};
pub use credit::{
    ConsistencyChecker, LedgerError, LedgerResult, LedgerStorage, ReceivableQuery,
    SyncOrchestrator,
};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;
