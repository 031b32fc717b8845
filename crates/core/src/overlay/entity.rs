use crate::overlay::error::{NormalizeError, WidgetError};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// # Summary
/// 回测事件的时间戳，按表示形式分类。
///
/// # Invariants
/// - 大于 [`EventTimestamp::MILLIS_THRESHOLD`] 的数值为 `EpochMillis`，
///   其余数值为 `EpochSeconds`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventTimestamp {
    Iso(String),
    EpochSeconds(i64),
    EpochMillis(i64),
}

impl EventTimestamp {
    pub const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

    /// 对整数 epoch 值分类。
    pub fn from_epoch(value: i64) -> Self {
        if value > Self::MILLIS_THRESHOLD {
            EventTimestamp::EpochMillis(value)
        } else {
            EventTimestamp::EpochSeconds(value)
        }
    }

    /// # Summary
    /// 对线上传来的原始值分类。
    ///
    /// # Logic
    /// 1. 字符串归为 `Iso`。
    /// 2. 整数交给 [`EventTimestamp::from_epoch`] 分类。
    /// 3. 有限浮点数向下取整后再分类。
    ///
    /// # Returns
    /// 其他 JSON 类型或非有限 / 越界浮点数返回 `None`。
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(EventTimestamp::Iso(s.clone())),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::from_epoch(i)),
                None => n.as_f64().and_then(float_to_epoch).map(Self::from_epoch),
            },
            _ => None,
        }
    }

    /// # Summary
    /// 将时间戳转换为 epoch 秒。
    ///
    /// # Logic
    /// 1. `Iso`: 优先 RFC 3339; 否则按 UTC 解析无时区的 `YYYY-MM-DD[T| ]HH:MM:SS[.f]`。
    /// 2. `EpochMillis`: 整除 1000。
    /// 3. `EpochSeconds`: 原样返回。
    ///
    /// # Returns
    /// epoch 秒; 字符串不是日期时返回 `NormalizeError::Timestamp`。
    pub fn normalize(&self) -> Result<i64, NormalizeError> {
        match self {
            EventTimestamp::EpochSeconds(s) => Ok(*s),
            EventTimestamp::EpochMillis(ms) => Ok(ms.div_euclid(1000)),
            EventTimestamp::Iso(text) => parse_iso_seconds(text)
                .ok_or_else(|| NormalizeError::Timestamp(text.clone())),
        }
    }
}

fn parse_iso_seconds(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc().timestamp())
}

// i64 约覆盖 +/- 9.2e18，超出范围直接拒绝而非饱和截断。
#[allow(clippy::cast_possible_truncation)]
fn float_to_epoch(value: f64) -> Option<i64> {
    let floored = value.floor();
    if floored.is_finite() && floored.abs() < 9.0e18 {
        Some(floored as i64)
    } else {
        None
    }
}

/// 上游发送的回测事件价格: 数字或数字字符串。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPrice {
    Number(f64),
    Text(String),
}

impl EventPrice {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(EventPrice::Number),
            Value::String(s) => Some(EventPrice::Text(s.clone())),
            _ => None,
        }
    }

    /// 有限数值价格，或 `NormalizeError::Price`。
    pub fn normalize(&self) -> Result<f64, NormalizeError> {
        let parsed = match self {
            EventPrice::Number(v) => Some(*v),
            EventPrice::Text(s) => s.trim().parse::<f64>().ok(),
        };
        parsed
            .filter(|v| v.is_finite())
            .ok_or_else(|| NormalizeError::Price(self.to_string()))
    }
}

impl std::fmt::Display for EventPrice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventPrice::Number(v) => write!(f, "{}", v),
            EventPrice::Text(s) => write!(f, "{}", s),
        }
    }
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<Option<EventTimestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(EventTimestamp::from_json(&value))
}

fn de_price<'de, D>(deserializer: D) -> Result<Option<EventPrice>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(EventPrice::from_json(&value))
}

fn de_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(ToString::to_string))
}

fn de_event_type<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_text(deserializer)?.unwrap_or_default())
}

// 计数字段可能是整数、整值浮点数或数字字符串。
fn de_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let count = match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).and_then(float_to_epoch)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(count)
}

fn de_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(EventPrice::from_json(&value).and_then(|p| p.normalize().ok()))
}

fn de_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_bool())
}

/// 回测事件类型，由 `type` 字段推导。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Entry,
    Exit,
    Break,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// # Summary
/// 回测结果流中的一条策略事件。
///
/// # Invariants
/// - 反序列化不会因字段形态而失败，
///   单个异常事件不会导致整批被拒。
/// - 无法使用的 `timestamp` / `price` 置为 `None`，在规范化阶段被拒;
///   缺失或非字符串的 `type` 置为空串并作为不支持类型跳过;
///   其余无法使用的字段置为 `None`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestEvent {
    #[serde(rename = "type", default, deserialize_with = "de_event_type")]
    pub event_type: String,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub timestamp: Option<EventTimestamp>,
    #[serde(default, deserialize_with = "de_price")]
    pub price: Option<EventPrice>,
    #[serde(default, deserialize_with = "de_text", skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, deserialize_with = "de_count", skip_serializing_if = "Option::is_none")]
    pub entry_number: Option<i64>,
    #[serde(default, deserialize_with = "de_count", skip_serializing_if = "Option::is_none")]
    pub entry_count: Option<i64>,
    #[serde(default, deserialize_with = "de_number", skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
    #[serde(default, deserialize_with = "de_flag", skip_serializing_if = "Option::is_none")]
    pub should_trade: Option<bool>,
}

impl BacktestEvent {
    pub fn kind(&self) -> EventKind {
        match self.event_type.to_ascii_lowercase().as_str() {
            "entry" => EventKind::Entry,
            "exit" => EventKind::Exit,
            "break" => EventKind::Break,
            _ => EventKind::Other(self.event_type.clone()),
        }
    }

    /// 交易方向，大小写不敏感; BUY/SELL 以外为 `None`。
    pub fn direction(&self) -> Option<Direction> {
        match self.direction.as_deref().map(str::to_ascii_uppercase).as_deref() {
            Some("BUY") => Some(Direction::Buy),
            Some("SELL") => Some(Direction::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Glyph {
    ArrowUp,
    ArrowDown,
    Circle,
    XCross,
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerColor {
    Green,
    Red,
    Gray,
    Blue,
    Amber,
}

impl MarkerColor {
    pub fn hex(&self) -> &'static str {
        match self {
            MarkerColor::Green => "#26a69a",
            MarkerColor::Red => "#ef5350",
            MarkerColor::Gray => "#9e9e9e",
            MarkerColor::Blue => "#2962ff",
            MarkerColor::Amber => "#ffb300",
        }
    }
}

/// # Summary
/// 为一条回测事件在图表上绘制的标注。
///
/// # Invariants
/// - `time` 为 epoch 秒。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayMarker {
    pub time: i64,
    pub price: f64,
    pub glyph: Glyph,
    pub color: MarkerColor,
    pub text: String,
}

/// 图表组件为已绘制图形分配的标识。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeId(pub String);

/// 一次绘制请求的进度。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPhase {
    WaitingForWidget,
    WaitingForChartReady,
    Drawing,
    Done,
}

/// 事件未生成标记的原因。
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Normalize(NormalizeError),
    UnsupportedType(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEvent {
    pub index: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedMarker {
    pub index: usize,
    pub shape_id: ShapeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedSubmission {
    pub index: usize,
    pub error: WidgetError,
}

/// # Summary
/// 一轮绘制中每个事件的结果。
///
/// # Invariants
/// - 每个输入下标恰好出现在三个列表之一。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawReport {
    pub submitted: Vec<SubmittedMarker>,
    pub skipped: Vec<SkippedEvent>,
    pub failed: Vec<FailedSubmission>,
}

impl DrawReport {
    pub fn total(&self) -> usize {
        self.submitted.len() + self.skipped.len() + self.failed.len()
    }
}
