use crate::slot::WidgetSlot;
use chartbridge_core::config::OverlayConfig;
use chartbridge_core::overlay::error::OverlayError;
use chartbridge_core::overlay::port::ChartWidget;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// # Summary
/// 等待图表组件的上限约束。
///
/// # Invariants
/// - 至少尝试一次，即使 `max_attempts` 为 0。
/// - `timeout` 同时覆盖等待组件与等待图表就绪信号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&OverlayConfig::default())
    }
}

impl From<&OverlayConfig> for RetryPolicy {
    fn from(config: &OverlayConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_attempts,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// # Summary
/// 轮询 `slot` 直到组件被安装。
///
/// # Logic
/// 1. 检查槽位，存在组件则返回。
/// 2. 否则休眠 `interval` 后重试，最多检查 `max_attempts` 次。
///
/// # Returns
/// 组件，或携带检查次数的 `OverlayError::WidgetUnavailable`。
pub async fn wait_for_widget(
    slot: &WidgetSlot,
    policy: &RetryPolicy,
) -> Result<Arc<dyn ChartWidget>, OverlayError> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        if let Some(widget) = slot.current() {
            if attempt > 1 {
                debug!(attempt, "chart widget became available");
            }
            return Ok(widget);
        }
        if attempt < attempts {
            debug!(attempt, "chart widget not installed yet, retrying");
            tokio::time::sleep(policy.interval).await;
        }
    }
    Err(OverlayError::WidgetUnavailable { attempts })
}
