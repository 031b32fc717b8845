use std::path::Path;
use std::sync::Arc;

use chartbridge_api::server::{AppState, start_server};
use chartbridge_core::common::time::RealTimeProvider;
use chartbridge_store::csv_store::CsvBarStore;
use tracing::{info, warn};

mod settings;
mod telemetry;

/// # Summary
/// 应用入口，将具体适配器装配到核心端口之后。
///
/// # Logic
/// 1. 加载配置 (默认值、可选文件、环境变量)。
/// 2. 初始化日志。
/// 3. 构建 CSV K 线存储与共享 API 状态。
/// 4. 提供 UDF 后端服务直到 Ctrl-C。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 配置
    let config = settings::load_config(Path::new(settings::CONFIG_FILE))?;

    // 2. 日志; guard 在 drop 时刷新文件写入器
    let _log_guard = telemetry::init(&config.logging)?;
    info!("chartbridge starting...");

    // 3. 基础设施
    let store = CsvBarStore::new(&config.store.data_dir);
    match store.latest_file() {
        Ok(Some(path)) => info!(file = %path.display(), "serving bars from csv"),
        Ok(None) => warn!(dir = %config.store.data_dir, "no csv file yet, history answers no_data"),
        Err(e) => warn!(error = %e, "data directory not readable"),
    }

    let state = AppState {
        store: Arc::new(store),
        instrument: config.instrument.clone(),
        clock: Arc::new(RealTimeProvider),
    };

    // 4. 持续服务直到 Ctrl-C
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    start_server(state, &config.server.udf_prefix, &bind_addr, async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received. Exiting..."),
            Err(e) => {
                warn!(error = %e, "failed to listen for Ctrl-C, serving until killed");
                std::future::pending::<()>().await;
            }
        }
    })
    .await?;

    Ok(())
}
