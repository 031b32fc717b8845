use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 后端应用配置。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub instrument: InstrumentConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// UDF 路由挂载的路径前缀。
    pub udf_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 扫描 CSV K 线文件的目录，取最新修改的文件。
    pub data_dir: String,
}

/// `/symbols` 返回的静态品种元数据。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub description: String,
    pub exchange: String,
    pub symbol_type: String,
    pub session: String,
    pub timezone: String,
    pub pricescale: u32,
    pub minmov: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 未设置 `RUST_LOG` 时使用的 `EnvFilter` 指令。
    pub filter: String,
    /// 设置后日志还会写入该目录下按天滚动的文件。
    pub dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            udf_prefix: "/api/tv".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: "data/raw".to_string(),
        }
    }
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            description: "XAU/USD".to_string(),
            exchange: "FOREX".to_string(),
            symbol_type: "forex".to_string(),
            session: "24x7".to_string(),
            timezone: "Etc/UTC".to_string(),
            pricescale: 100,
            minmov: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            dir: None,
        }
    }
}

/// # Summary
/// 图表桥接客户端配置。
///
/// # Invariants
/// - `datafeed_url` 结尾可带可不带斜杠; 接口路径以单个 `/` 拼接。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// UDF 后端基础地址，例如 `http://127.0.0.1:8000/api/tv`。
    pub datafeed_url: String,
    /// 附加到每个后端请求上的额外请求头。
    pub headers: HashMap<String, String>,
    pub overlay: OverlayConfig,
}

/// 标记同步器轮询图表组件时的上限参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
    pub timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            datafeed_url: "http://127.0.0.1:8000/api/tv".to_string(),
            headers: HashMap::new(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            max_attempts: 120,
            timeout_ms: 60_000,
        }
    }
}
