use chartbridge_core::common::Resolution;
use chartbridge_core::market::entity::Candle;
use chrono::DateTime;

/// # Summary
/// 将有序 K 线按 `resolution` 分桶聚合。
///
/// # Invariants
/// * 输入须按时间排序; 输出有序，每个非空桶一根 K 线，
///   时间取桶的起点。
/// * 日线及更长周期原样返回。
///
/// # Logic
/// 1. 桶起点 = `time` 向下取整到 `resolution.seconds()` 的倍数。
/// 2. 每个桶: 开盘取首个，最高取最大，最低取最小，收盘取末个，成交量求和。
pub fn resample(bars: &[Candle], resolution: Resolution) -> Vec<Candle> {
    if !resolution.is_intraday() {
        return bars.to_vec();
    }
    let period = resolution.seconds();
    let mut out: Vec<Candle> = Vec::with_capacity(bars.len());
    let mut current_bucket: Option<i64> = None;

    for bar in bars {
        let bucket = bar.time.timestamp().div_euclid(period) * period;
        match out.last_mut() {
            Some(agg) if current_bucket == Some(bucket) => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            }
            _ => {
                let Some(start) = DateTime::from_timestamp(bucket, 0) else {
                    continue;
                };
                current_bucket = Some(bucket);
                out.push(Candle {
                    time: start,
                    ..bar.clone()
                });
            }
        }
    }
    out
}
