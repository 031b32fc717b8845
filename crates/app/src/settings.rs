use chartbridge_core::config::AppConfig;
use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// 可选配置文件的默认位置。
pub const CONFIG_FILE: &str = "config/chartbridge.toml";

/// 环境变量覆盖的前缀，例如 `CHARTBRIDGE__SERVER__PORT=9000`。
pub const ENV_PREFIX: &str = "CHARTBRIDGE";

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 1. 内置默认值 (通过 `#[serde(default)]` 取 `AppConfig::default()`)。
/// 2. 文件存在时读取 `path`。
/// 3. `CHARTBRIDGE__*` 环境变量，以 `__` 分隔嵌套键。
///
/// # Returns
/// 合并后的配置，或首个解析失败的来源。
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
