use std::time::Duration;
use thiserror::Error;

/// # Summary
/// 整个绘制请求未能绘制的原因。
///
/// # Invariants
/// - 单个事件的失败不在此体现，而是记录在 `DrawReport` 中。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    /// 所有轮询尝试中组件槽位始终为空。
    #[error("Chart widget not available after {attempts} attempts")]
    WidgetUnavailable { attempts: u32 },
    /// 等待组件及其图表就绪信号超出总时限。
    #[error("Timed out after {0:?} waiting for the chart widget")]
    Timeout(Duration),
    /// 组件未调用即丢弃了图表就绪回调。
    #[error("Chart widget dropped its readiness callback")]
    ReadinessDropped,
    #[error("Draw request cancelled")]
    Cancelled,
    /// 后台绘制任务 panic。
    #[error("Draw task aborted: {0}")]
    Aborted(String),
}

/// 组件对单次调用报告的失败。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WidgetError {
    #[error("Shape rejected: {0}")]
    Rejected(String),
    #[error("Chart widget is not installed")]
    Unavailable,
}

/// 无法转换为标记锚点的事件值。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Invalid timestamp: {0}")]
    Timestamp(String),
    #[error("Invalid price: {0}")]
    Price(String),
}
