//! # DTO 层
//!
//! UDF 契约的线上结构。所有 DTO 均派生 `utoipa::ToSchema`，
//! 以便出现在 Swagger 文档中。

use chartbridge_core::config::InstrumentConfig;
use chartbridge_core::market::entity::Candle;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// ============================================================
//  /config
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExchangeDto {
    #[schema(example = "FOREX")]
    pub value: String,
    #[schema(example = "Forex")]
    pub name: String,
    #[schema(example = "Forex")]
    pub desc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SymbolTypeDto {
    #[schema(example = "forex")]
    pub name: String,
    #[schema(example = "forex")]
    pub value: String,
}

/// 向数据源公布的能力集。
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UdfConfigResponse {
    pub supports_search: bool,
    pub supports_group_request: bool,
    pub supports_marks: bool,
    pub supports_timescale_marks: bool,
    pub supports_time: bool,
    pub exchanges: Vec<ExchangeDto>,
    pub symbols_types: Vec<SymbolTypeDto>,
    #[schema(example = json!(["1", "5", "15", "30", "60", "240", "1D", "1W", "1M"]))]
    pub supported_resolutions: Vec<String>,
}

// ============================================================
//  /symbols
// ============================================================

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SymbolQuery {
    /// 待解析的代码
    pub symbol: String,
    pub currency_code: Option<String>,
    pub unit_id: Option<String>,
}

/// 品种描述。除名称外均来自配置的品种。
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SymbolInfoResponse {
    #[schema(example = "XAUUSD")]
    pub name: String,
    pub ticker: String,
    #[schema(example = "XAU/USD")]
    pub description: String,
    #[serde(rename = "type")]
    #[schema(example = "forex")]
    pub symbol_type: String,
    #[schema(example = "24x7")]
    pub session: String,
    #[schema(example = "Etc/UTC")]
    pub timezone: String,
    pub exchange: String,
    pub listed_exchange: String,
    pub exchange_listed_name: String,
    pub minmov: u32,
    pub pricescale: u32,
    pub has_intraday: bool,
    pub has_daily: bool,
    pub has_weekly_and_monthly: bool,
    pub supported_resolutions: Vec<String>,
    pub intraday_multipliers: Vec<String>,
    pub volume_precision: u32,
    #[schema(example = "streaming")]
    pub data_status: String,
    #[schema(example = "price")]
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
}

impl SymbolInfoResponse {
    pub fn from_instrument(
        query: SymbolQuery,
        instrument: &InstrumentConfig,
        resolutions: Vec<String>,
        intraday_multipliers: Vec<String>,
    ) -> Self {
        Self {
            name: query.symbol.clone(),
            exchange_listed_name: format!("{}:{}", instrument.exchange, query.symbol),
            ticker: query.symbol,
            description: instrument.description.clone(),
            symbol_type: instrument.symbol_type.clone(),
            session: instrument.session.clone(),
            timezone: instrument.timezone.clone(),
            exchange: instrument.exchange.clone(),
            listed_exchange: instrument.exchange.clone(),
            minmov: instrument.minmov,
            pricescale: instrument.pricescale,
            has_intraday: true,
            has_daily: true,
            has_weekly_and_monthly: true,
            supported_resolutions: resolutions,
            intraday_multipliers,
            volume_precision: 0,
            data_status: "streaming".to_string(),
            format: "price".to_string(),
            currency_code: query.currency_code,
            unit_id: query.unit_id,
        }
    }
}

// ============================================================
//  /history
// ============================================================

/// 原始历史查询。所有字段均为可选文本，
/// 使非法输入得到 UDF 错误响应体，而非提取器拒绝。
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    pub symbol: Option<String>,
    /// 周期标记 (1, 5, 15, 30, 60, 240, 1D, 1W, 1M)
    pub resolution: Option<String>,
    /// 区间起点，epoch 秒
    #[serde(alias = "from_time")]
    pub from: Option<String>,
    /// 区间终点，epoch 秒 (含)
    #[serde(alias = "to_time")]
    pub to: Option<String>,
    /// 截止到 `to` 的 K 线数量; 优先于 `from`
    pub countback: Option<String>,
}

/// UDF 历史响应体: 带并列数组的 `ok`、`no_data` 或 `error`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    #[schema(example = "ok")]
    pub s: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errmsg: Option<String>,
    #[serde(rename = "nextTime", skip_serializing_if = "Option::is_none")]
    pub next_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub o: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<Vec<f64>>,
}

impl HistoryResponse {
    pub fn ok(bars: &[Candle]) -> Self {
        Self {
            s: "ok".to_string(),
            t: Some(bars.iter().map(|b| b.time.timestamp()).collect()),
            o: Some(bars.iter().map(|b| b.open).collect()),
            h: Some(bars.iter().map(|b| b.high).collect()),
            l: Some(bars.iter().map(|b| b.low).collect()),
            c: Some(bars.iter().map(|b| b.close).collect()),
            v: Some(bars.iter().map(|b| b.volume).collect()),
            ..Default::default()
        }
    }

    pub fn no_data(next_time: Option<i64>) -> Self {
        Self {
            s: "no_data".to_string(),
            next_time,
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            s: "error".to_string(),
            errmsg: Some(message.into()),
            ..Default::default()
        }
    }
}
