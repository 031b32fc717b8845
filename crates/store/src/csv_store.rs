use crate::time::parse_cell_time;
use async_trait::async_trait;
use chartbridge_core::market::entity::Candle;
use chartbridge_core::store::error::StoreError;
use chartbridge_core::store::port::BarStore;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// 基于 CSV 导出目录的 BarStore。
///
/// # Summary
/// 每次 `load` 读取 `data_dir` 中最新修改的 `*.csv`，
/// 放入新的导出文件即可切换提供的数据。
///
/// # Invariants
/// * 目录不存在或为空时返回空 K 线，而非错误。
/// * 返回的 K 线按时间排序并去除重复时间戳
///   (保留首行)。
pub struct CsvBarStore {
    data_dir: PathBuf,
}

impl CsvBarStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// 数据目录中最新的 `*.csv` (如有)。
    pub fn latest_file(&self) -> Result<Option<PathBuf>, StoreError> {
        latest_csv(&self.data_dir)
    }
}

#[async_trait]
impl BarStore for CsvBarStore {
    async fn load(&self, symbol: &str) -> Result<Vec<Candle>, StoreError> {
        let data_dir = self.data_dir.clone();
        let bars = tokio::task::spawn_blocking(move || -> Result<Vec<Candle>, StoreError> {
            match latest_csv(&data_dir)? {
                Some(path) => read_bars(&path),
                None => {
                    debug!(dir = %data_dir.display(), "no csv file in data directory");
                    Ok(Vec::new())
                }
            }
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))??;

        debug!(symbol, bars = bars.len(), "bars loaded");
        Ok(bars)
    }
}

/// # Summary
/// 挑选最近修改的 `*.csv` (扩展名大小写不敏感)。
///
/// # Returns
/// 目录不存在或没有 csv 文件时返回 `Ok(None)`。
pub fn latest_csv(dir: &Path) -> Result<Option<PathBuf>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::Io(e.to_string())),
    };

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::Io(e.to_string()))?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv || !path.is_file() {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| StoreError::Io(e.to_string()))?;
        if newest.as_ref().is_none_or(|(time, _)| modified > *time) {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// # Summary
/// 将一个 CSV 导出文件读取为有序、去重的 K 线。
///
/// # Logic
/// 1. 从表头行嗅探分隔符。
/// 2. 按大小写不敏感的表头名定位时间列与 OHLCV 列。
/// 3. 逐行解析，无法读取的行记录警告后跳过。
/// 4. 按时间排序并去除重复时间戳。
///
/// # Returns
/// K 线; 表头缺少必需列时返回 `StoreError::Csv`。
pub fn read_bars(path: &Path) -> Result<Vec<Candle>, StoreError> {
    let delimiter = sniff_delimiter(path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| StoreError::Csv(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| StoreError::Csv(e.to_string()))?
        .clone();
    let columns = Columns::locate(&headers)?;

    let mut bars = Vec::new();
    let mut skipped = 0usize;
    for (row, record) in reader.records().enumerate() {
        let parsed = match record {
            Ok(record) => columns.parse(&record),
            Err(e) => {
                debug!(row, error = %e, "unreadable csv row");
                None
            }
        };
        match parsed {
            Some(candle) => bars.push(candle),
            None => {
                warn!(row, file = %path.display(), "skipping malformed csv row");
                skipped += 1;
            }
        }
    }

    bars.sort_by_key(|c| c.time);
    bars.dedup_by_key(|c| c.time);
    info!(
        file = %path.display(),
        bars = bars.len(),
        skipped,
        "csv bar file read"
    );
    Ok(bars)
}

fn sniff_delimiter(path: &Path) -> Result<u8, StoreError> {
    let file = fs::File::open(path).map_err(|e| StoreError::Io(e.to_string()))?;
    let mut header = String::new();
    BufReader::new(file)
        .read_line(&mut header)
        .map_err(|e| StoreError::Io(e.to_string()))?;
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    Ok(if semicolons > commas { b';' } else { b',' })
}

enum TimeColumn {
    Single(usize),
    // MetaTrader 导出将日期与时刻分为两列
    DateAndTime(usize, usize),
}

struct Columns {
    time: TimeColumn,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, StoreError> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |name: &str| names.iter().position(|h| h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| StoreError::Csv(format!("missing column: {}", name)))
        };

        let time = match (find("timestamp"), find("date"), find("time")) {
            (Some(idx), _, _) => TimeColumn::Single(idx),
            (None, Some(date), Some(time)) => TimeColumn::DateAndTime(date, time),
            (None, _, Some(idx)) => TimeColumn::Single(idx),
            (None, date, None) => find("datetime")
                .or_else(|| find("local time"))
                .or(date)
                .map(TimeColumn::Single)
                .ok_or_else(|| StoreError::Csv("missing time column".to_string()))?,
        };

        Ok(Self {
            time,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
        })
    }

    fn parse(&self, record: &StringRecord) -> Option<Candle> {
        let time = match self.time {
            TimeColumn::Single(idx) => parse_cell_time(record.get(idx)?)?,
            TimeColumn::DateAndTime(date, time) => {
                parse_cell_time(&format!("{} {}", record.get(date)?, record.get(time)?))?
            }
        };
        let number = |idx: usize| {
            record
                .get(idx)
                .and_then(|cell| cell.parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };
        let volume = match self.volume {
            Some(idx) => match record.get(idx) {
                Some("") | None => 0.0,
                Some(_) => number(idx)?,
            },
            None => 0.0,
        };
        Some(Candle {
            time,
            open: number(self.open)?,
            high: number(self.high)?,
            low: number(self.low)?,
            close: number(self.close)?,
            volume,
        })
    }
}
