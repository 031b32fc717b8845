use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// # Summary
/// 通过 `/config` 与 UDF 后端协商得到的能力集。
///
/// # Invariants
/// - 协商器写入后不再变更。
/// - `Default` 是协商失败时使用的保守默认值;
///   后端缺省的字段同样以它补齐。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfiguration {
    pub supported_resolutions: Vec<String>,
    pub supports_search: bool,
    pub supports_group_request: bool,
    pub supports_marks: bool,
    pub supports_timescale_marks: bool,
    pub supports_time: bool,
    pub exchanges: Vec<ExchangeInfo>,
    pub symbols_types: Vec<SymbolTypeInfo>,
}

impl Default for FeedConfiguration {
    fn default() -> Self {
        Self {
            supported_resolutions: ["1", "5", "15", "30", "60", "240", "1D", "1W", "1M"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            supports_search: false,
            supports_group_request: true,
            supports_marks: false,
            supports_timescale_marks: false,
            supports_time: false,
            exchanges: Vec::new(),
            symbols_types: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeInfo {
    pub value: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTypeInfo {
    pub name: String,
    pub value: String,
}

/// # Summary
/// `/symbols` 返回的品种描述。
///
/// # Invariants
/// - 只有 `name` 必填，其余字段缺失时取默认值。
/// - 未建模的字段原样保存在 `extra` 中，
///   交给图表组件的仍是后端原始描述。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub symbol_type: String,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub exchange: String,
    /// 最小价格变动，单位为 `1 / pricescale`。
    #[serde(default)]
    pub minmov: f64,
    #[serde(default)]
    pub pricescale: u64,
    #[serde(default)]
    pub has_intraday: bool,
    #[serde(default)]
    pub has_daily: bool,
    #[serde(default)]
    pub has_weekly_and_monthly: bool,
    #[serde(default)]
    pub supported_resolutions: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SymbolDescriptor {
    /// 作为 `symbol` 发给 `/history` 的名称: 优先 `name`，为空时用 `ticker`。
    pub fn history_symbol(&self) -> &str {
        match (&self.ticker, self.name.is_empty()) {
            (Some(ticker), true) => ticker,
            _ => &self.name,
        }
    }
}

/// 透传给 `/symbols` 的可选提示参数。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolHints {
    pub currency_code: Option<String>,
    pub unit_id: Option<String>,
}

/// # Summary
/// 交付给图表组件的一根 OHLCV K 线。
///
/// # Invariants
/// - `time` 为 epoch **毫秒**。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// 一页历史数据的分页元信息。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMeta {
    pub no_data: bool,
    /// 向前翻页的游标; `None` 表示没有更早的数据。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_time: Option<i64>,
}

/// # Summary
/// 一次历史查询的结果。
///
/// # Invariants
/// - `meta.no_data` 为真时 `bars` 必为空。
/// - K 线时间戳严格递增。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarPage {
    pub bars: Vec<Bar>,
    pub meta: HistoryMeta,
}

impl BarPage {
    /// 标记为无数据的空页。
    pub fn no_data(next_time: Option<i64>) -> Self {
        Self {
            bars: Vec::new(),
            meta: HistoryMeta {
                no_data: true,
                next_time,
            },
        }
    }
}

/// # Summary
/// 图表组件请求的时间窗口。
///
/// # Invariants
/// - `from` 与 `to` 为 epoch 秒。
/// - 设置 `count_back` 时，后端返回截止到 `to` 的该数量 K 线，
///   并忽略 `from`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodParams {
    pub from: i64,
    pub to: i64,
    pub count_back: Option<u32>,
    pub first_data_request: bool,
}

/// 原始类型的查询参数值。
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Text(s) => write!(f, "{}", s),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// # Summary
/// 一次后端调用的扁平、有序查询参数集合。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, ParamValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加 `key=value`。
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.pairs.push((key.to_string(), value.into()));
        self
    }

    /// 仅当 `value` 存在时追加 `key=value`。
    pub fn with_opt<V: Into<ParamValue>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}
