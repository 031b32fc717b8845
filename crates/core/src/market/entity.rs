use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 后端存储的一根 OHLCV K 线。
///
/// # Invariants
/// - `time` 为 K 线开盘时间。
/// - 数据规范时 `high` 不低于 `open`、`close` 与 `low`;
///   存储层不做强制校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    // 数据源无成交量列时为 0
    pub volume: f64,
}
