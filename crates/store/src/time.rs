use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y.%m.%d"];

/// # Summary
/// 将 CSV 时间单元格解析为 UTC 时刻。
///
/// # Logic
/// 1. 整数: 大于 1e12 为 epoch 毫秒，否则为 epoch 秒。
/// 2. 小数 (`1325412060.0`): 向下取整后同上。
/// 3. 先 RFC 3339，再 Dukascopy `DD.MM.YYYY HH:MM:SS.fff GMT+hhmm`。
/// 4. 无时区的日期时间与纯日期，按 UTC 处理。
///
/// # Returns
/// 没有格式匹配时返回 `None`。
pub fn parse_cell_time(cell: &str) -> Option<DateTime<Utc>> {
    let text = cell.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(epoch) = text.parse::<i64>() {
        return from_epoch(epoch);
    }
    if let Ok(value) = text.parse::<f64>() {
        return float_to_epoch(value).and_then(from_epoch);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%d.%m.%Y %H:%M:%S%.f GMT%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value > MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float_to_epoch(value: f64) -> Option<i64> {
    let floored = value.floor();
    (floored.is_finite() && floored.abs() < 9.0e18).then(|| floored as i64)
}
