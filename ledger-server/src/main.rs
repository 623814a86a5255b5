use ledger_server::{Config, Server, init_logger_with_file};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // 1. Load .env file
    let _ = dotenvy::dotenv();

    // 2. 加载配置
    let config = Config::from_env();

    // 3. 日志
    let log_dir = config.log_dir();
    init_logger_with_file(
        &config.log_level,
        config.log_to_file.then_some(log_dir.as_path()),
    );

    tracing::info!(
        work_dir = %config.work_dir,
        default_credit_days = config.default_credit_days,
        "ledger-server starting"
    );

    // 4. 启动 HTTP 服务器
    let server = Server::new(config);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
