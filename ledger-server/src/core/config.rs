use std::path::PathBuf;

use crate::credit::consistency::{DEFAULT_BATCH_SIZE, clamp_batch_size};
use crate::credit::sync::{DEFAULT_CREDIT_DAYS, MAX_CREDIT_DAYS};

/// Default interval of the overdue sweep (1 hour)
pub const DEFAULT_OVERDUE_SWEEP_SECS: u64 = 3600;

/// 服务器配置 - 应收台账服务的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖（启动时先加载 `.env`）：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录（数据库、日志） |
/// | HTTP_PORT | 3100 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 未设置 RUST_LOG 时的日志级别 |
/// | LOG_TO_FILE | false | 是否同时写入按天滚动的日志文件 |
/// | DEFAULT_CREDIT_DAYS | 30 | 建档请求未指定账期时使用 |
/// | RECONCILE_BATCH_SIZE | 200 | 对账分页大小 (1..=1000) |
/// | OVERDUE_SWEEP_SECS | 3600 | 逾期扫描间隔（秒），0 表示关闭 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/ledger HTTP_PORT=8080 cargo run -p ledger-server
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 默认日志级别
    pub log_level: String,
    /// 是否写日志文件
    pub log_to_file: bool,
    /// 默认账期（天）
    pub default_credit_days: i64,
    /// 对账分页大小
    pub reconcile_batch_size: usize,
    /// 逾期扫描间隔（秒），0 表示关闭
    pub overdue_sweep_secs: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3100),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_to_file: std::env::var("LOG_TO_FILE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            default_credit_days: std::env::var("DEFAULT_CREDIT_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|d| (0..=MAX_CREDIT_DAYS).contains(d))
                .unwrap_or(DEFAULT_CREDIT_DAYS),
            reconcile_batch_size: std::env::var("RECONCILE_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(clamp_batch_size)
                .unwrap_or(DEFAULT_BATCH_SIZE),
            overdue_sweep_secs: std::env::var("OVERDUE_SWEEP_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_OVERDUE_SWEEP_SECS),
        }
    }

    /// 使用自定义工作目录和端口覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库目录
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 数据库文件路径
    pub fn database_path(&self) -> PathBuf {
        self.database_dir().join("ledger.redb")
    }

    /// 日志目录
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
