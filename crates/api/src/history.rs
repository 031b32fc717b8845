//! # 历史窗口选取
//!
//! `/history` 的纯逻辑部分: 请求校验，以及从已重采样的序列中
//! 选取 K 线。

use chartbridge_core::common::Resolution;
use chartbridge_core::market::entity::Candle;

use crate::error::ApiError;
use crate::types::HistoryQuery;

/// 校验后的 `/history` 请求。
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRequest {
    pub symbol: String,
    pub resolution: Resolution,
    pub from: i64,
    pub to: i64,
    pub countback: Option<usize>,
}

impl TryFrom<HistoryQuery> for HistoryRequest {
    type Error = ApiError;

    /// # Logic
    /// 1. `from` 与 `to` 必须同时存在，且均为整数。
    /// 2. 周期必须是已知标记。
    /// 3. 非数字或为零的 `countback` 被忽略。
    fn try_from(query: HistoryQuery) -> Result<Self, Self::Error> {
        let (Some(from), Some(to)) = (query.from, query.to) else {
            return Err(ApiError::MissingRange);
        };
        let from = from.trim().parse::<i64>().map_err(|_| ApiError::InvalidTimestamp)?;
        let to = to.trim().parse::<i64>().map_err(|_| ApiError::InvalidTimestamp)?;
        let token = query
            .resolution
            .ok_or(ApiError::MissingParameter("resolution"))?;
        let resolution = token
            .parse::<Resolution>()
            .map_err(|_| ApiError::UnsupportedResolution(token))?;
        let countback = query
            .countback
            .and_then(|c| c.trim().parse::<usize>().ok())
            .filter(|c| *c > 0);

        Ok(Self {
            symbol: query.symbol.unwrap_or_default(),
            resolution,
            from,
            to,
            countback,
        })
    }
}

/// 对 K 线序列应用请求窗口的结果。
#[derive(Debug, Clone, PartialEq)]
pub enum Window<'a> {
    Bars(&'a [Candle]),
    Empty { next_time: Option<i64> },
}

/// # Summary
/// 选取请求所需的 K 线。
///
/// # Invariants
/// * `bars` 按时间排序，因此每次选取都是连续切片。
///
/// # Logic
/// 1. 有 `countback` 时: 取 `to` 及之前的最后 `countback` 根。
/// 2. 否则: 取 `from <= time <= to` 的 K 线。
/// 3. 未选中任何 K 线: 返回 `Empty`，指向 `from` 之前最新的一根。
pub fn select_window<'a>(bars: &'a [Candle], request: &HistoryRequest) -> Window<'a> {
    let end = bars.partition_point(|b| b.time.timestamp() <= request.to);
    let start = match request.countback {
        Some(count) => end.saturating_sub(count),
        None => bars.partition_point(|b| b.time.timestamp() < request.from),
    };

    if start < end {
        return Window::Bars(&bars[start..end]);
    }
    let before_from = bars.partition_point(|b| b.time.timestamp() < request.from);
    let next_time = before_from
        .checked_sub(1)
        .and_then(|idx| bars.get(idx))
        .map(|b| b.time.timestamp());
    Window::Empty { next_time }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn series(times: &[i64]) -> Vec<Candle> {
        times
            .iter()
            .map(|t| Candle {
                time: DateTime::from_timestamp(*t, 0).unwrap(),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 0.0,
            })
            .collect()
    }

    fn request(from: i64, to: i64, countback: Option<usize>) -> HistoryRequest {
        HistoryRequest {
            symbol: "XAUUSD".into(),
            resolution: Resolution::Minute1,
            from,
            to,
            countback,
        }
    }

    fn times(window: Window<'_>) -> Vec<i64> {
        match window {
            Window::Bars(bars) => bars.iter().map(|b| b.time.timestamp()).collect(),
            Window::Empty { .. } => Vec::new(),
        }
    }

    #[test]
    fn test_range_is_inclusive() {
        let bars = series(&[60, 120, 180, 240]);
        assert_eq!(times(select_window(&bars, &request(120, 180, None))), vec![120, 180]);
    }

    #[test]
    fn test_countback_ignores_from() {
        let bars = series(&[60, 120, 180, 240]);
        assert_eq!(
            times(select_window(&bars, &request(200, 180, Some(2)))),
            vec![120, 180]
        );
        assert_eq!(
            times(select_window(&bars, &request(0, 1_000, Some(10)))),
            vec![60, 120, 180, 240]
        );
    }

    #[test]
    fn test_empty_range_points_back() {
        let bars = series(&[60, 120, 180]);
        assert_eq!(
            select_window(&bars, &request(500, 900, None)),
            Window::Empty { next_time: Some(180) }
        );
        assert_eq!(
            select_window(&bars, &request(10, 50, None)),
            Window::Empty { next_time: None }
        );
    }

    #[test]
    fn test_query_validation() {
        let missing = HistoryQuery {
            resolution: Some("60".into()),
            from: Some("1".into()),
            ..Default::default()
        };
        assert!(matches!(HistoryRequest::try_from(missing), Err(ApiError::MissingRange)));

        let bad_ts = HistoryQuery {
            resolution: Some("60".into()),
            from: Some("abc".into()),
            to: Some("2".into()),
            ..Default::default()
        };
        assert!(matches!(
            HistoryRequest::try_from(bad_ts),
            Err(ApiError::InvalidTimestamp)
        ));

        let bad_res = HistoryQuery {
            resolution: Some("7".into()),
            from: Some("1".into()),
            to: Some("2".into()),
            ..Default::default()
        };
        assert_eq!(
            HistoryRequest::try_from(bad_res).unwrap_err().to_string(),
            "Unsupported resolution: 7"
        );

        let ok = HistoryQuery {
            symbol: Some("XAUUSD".into()),
            resolution: Some("1D".into()),
            from: Some("100".into()),
            to: Some("200".into()),
            countback: Some("0".into()),
        };
        let req = HistoryRequest::try_from(ok).unwrap();
        assert_eq!(req.resolution, Resolution::Day1);
        assert_eq!(req.countback, None);
    }
}
