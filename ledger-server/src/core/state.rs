use crate::core::{Config, Result};
use crate::credit::{ConsistencyChecker, LedgerStorage, ReceivableQuery, SyncOrchestrator};

/// 服务器状态 - 所有请求共享
///
/// 各服务内部共享同一个 [`LedgerStorage`]（内部为 `Arc<Database>`），克隆开销很小。
#[derive(Clone)]
pub struct ServerState {
    /// 建档、双向付款同步、迁移
    pub sync: SyncOrchestrator,
    /// 对账与修复
    pub checker: ConsistencyChecker,
    /// 只读查询与汇总
    pub query: ReceivableQuery,
}

impl ServerState {
    /// 打开数据库并组装服务
    ///
    /// 数据库位于 `WORK_DIR/database/ledger.redb`，目录不存在时自动创建。
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(config.database_dir())?;
        let storage = LedgerStorage::open(config.database_path())?;
        tracing::info!(path = %config.database_path().display(), "Ledger database opened");
        Ok(Self::with_storage(config, storage))
    }

    /// 使用已打开的存储组装服务
    pub fn with_storage(config: &Config, storage: LedgerStorage) -> Self {
        let sync = SyncOrchestrator::new(storage.clone(), config.default_credit_days);
        let checker = ConsistencyChecker::new(sync.clone(), config.reconcile_batch_size);
        let query = ReceivableQuery::new(storage);
        Self {
            sync,
            checker,
            query,
        }
    }
}
