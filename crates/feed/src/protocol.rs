//! 将 UDF 响应体解码为领域值。
//!
//! 此处函数均为纯函数: 接收传输层返回的 JSON 响应体，
//! 并应用协议的错误、无数据与结构规则。

use chartbridge_core::datafeed::entity::{Bar, BarPage, HistoryMeta, SymbolDescriptor};
use chartbridge_core::datafeed::error::DatafeedError;
use serde_json::{Map, Value};

const INVALID_RESPONSE: &str = "Invalid response from server";

/// 响应体为 `{s: "error", errmsg?}` 时返回 `Some(error)`。
pub fn error_status(value: &Value) -> Option<DatafeedError> {
    let obj = value.as_object()?;
    if obj.get("s").and_then(Value::as_str) != Some("error") {
        return None;
    }
    let errmsg = obj
        .get("errmsg")
        .and_then(Value::as_str)
        .map(ToString::to_string);
    Some(DatafeedError::protocol(errmsg))
}

/// # Summary
/// 解码 `/symbols` 响应体。
///
/// # Logic
/// 1. `{s: "error"}` 转为 `DatafeedError::Protocol`。
/// 2. 其余情况按结构解析为 `SymbolDescriptor`。
///
/// # Returns
/// 品种描述，或 `Protocol` / `Malformed`。
pub fn parse_symbol(value: Value) -> Result<SymbolDescriptor, DatafeedError> {
    if let Some(err) = error_status(&value) {
        return Err(err);
    }
    serde_json::from_value(value).map_err(|e| DatafeedError::Malformed(e.to_string()))
}

/// # Summary
/// 将 `/history` 响应体解码为一页 K 线。
///
/// # Logic
/// 1. 非对象响应体视为结构错误。
/// 2. `s == "error"` 为协议错误; `s == "no_data"` 为无数据空页。
/// 3. `t` 缺失、非数组或为空同样是无数据页。
/// 4. 否则按位置组合 `t,o,h,l,c` (有 `v` 时一并组合)，
///    并将 `t` 由秒转换为毫秒。
/// 5. 存在 `nextTime` 时原样转发。
///
/// # Returns
/// 数据页，或 `Protocol` / `Malformed`。
pub fn parse_history(value: &Value) -> Result<BarPage, DatafeedError> {
    let obj = value
        .as_object()
        .ok_or_else(|| DatafeedError::Malformed(INVALID_RESPONSE.to_string()))?;

    if let Some(err) = error_status(value) {
        return Err(err);
    }

    let next_time = match obj.get("nextTime") {
        None | Some(Value::Null) => None,
        Some(cursor) => Some(integral_seconds(cursor).ok_or_else(|| {
            DatafeedError::Malformed(format!("nextTime is not an epoch second: {}", cursor))
        })?),
    };
    if obj.get("s").and_then(Value::as_str) == Some("no_data") {
        return Ok(BarPage::no_data(next_time));
    }

    let times = match obj.get("t").and_then(Value::as_array) {
        Some(times) if !times.is_empty() => times,
        _ => return Ok(BarPage::no_data(next_time)),
    };

    let open = required_series(obj, "o", times.len())?;
    let high = required_series(obj, "h", times.len())?;
    let low = required_series(obj, "l", times.len())?;
    let close = required_series(obj, "c", times.len())?;
    let volume = obj.get("v").and_then(Value::as_array);

    let mut bars = Vec::with_capacity(times.len());
    let mut previous: Option<i64> = None;
    for (i, t) in times.iter().enumerate() {
        let seconds = t
            .as_i64()
            .ok_or_else(|| DatafeedError::Malformed(format!("t[{}] is not an integer", i)))?;
        if let Some(prev) = previous
            && seconds <= prev
        {
            return Err(DatafeedError::Malformed(format!(
                "t[{}] = {} is not after {}",
                i, seconds, prev
            )));
        }
        previous = Some(seconds);

        let time = seconds
            .checked_mul(1000)
            .ok_or_else(|| DatafeedError::Malformed(format!("t[{}] out of range", i)))?;

        bars.push(Bar {
            time,
            open: number_at(open, i, "o")?,
            high: number_at(high, i, "h")?,
            low: number_at(low, i, "l")?,
            close: number_at(close, i, "c")?,
            volume: volume.and_then(|v| v.get(i)).and_then(as_number),
        });
    }

    Ok(BarPage {
        bars,
        meta: HistoryMeta {
            no_data: false,
            next_time,
        },
    })
}

/// 解码 `/time` 响应体: 数字或数字字符串形式的 epoch 秒。
pub fn parse_server_time(value: &Value) -> Result<i64, DatafeedError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| DatafeedError::Malformed(format!("unexpected server time: {}", value)))
}

// 整数 epoch 秒; `1699990000.0` 合法，`1699990000.5` 不合法。
#[allow(clippy::cast_possible_truncation)]
fn integral_seconds(value: &Value) -> Option<i64> {
    let n = value.as_number()?;
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    n.as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e18)
        .map(|f| f as i64)
}

fn required_series<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    len: usize,
) -> Result<&'a Vec<Value>, DatafeedError> {
    let series = obj
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| DatafeedError::Malformed(format!("missing array `{}`", key)))?;
    if series.len() < len {
        return Err(DatafeedError::Malformed(format!(
            "array `{}` has {} values, expected {}",
            key,
            series.len(),
            len
        )));
    }
    Ok(series)
}

fn number_at(series: &[Value], index: usize, key: &str) -> Result<f64, DatafeedError> {
    series
        .get(index)
        .and_then(as_number)
        .ok_or_else(|| DatafeedError::Malformed(format!("{}[{}] is not a number", key, index)))
}

// 价格可能是数字或数字字符串。
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
