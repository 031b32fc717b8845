use chartbridge_core::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// # Summary
/// 安装全局 tracing 订阅器。
///
/// # Logic
/// 1. 过滤规则取自 `RUST_LOG`，缺省回退到 `logging.filter`。
/// 2. 在标准输出打印可读日志。
/// 3. 设置 `logging.dir` 时，额外写入按天滚动的纯文本文件。
///
/// # Returns
/// 文件写入器的 guard; 须持有到退出，否则缓冲日志会丢失。
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)?,
    };

    let (file_layer, guard) = match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "chartbridge.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()?;
    Ok(guard)
}
