use chrono::{DateTime, Utc};
use std::sync::RwLock;

/// # Summary
/// 时钟抽象，便于在测试中固定后端 `/time` 接口的返回值。
pub trait TimeProvider: Send + Sync {
    /// 提供者视角下的当前时间。
    fn now(&self) -> DateTime<Utc>;
}

/// # Summary
/// 操作系统的真实时钟。
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// 手动推进的模拟时钟。
///
/// # Invariants
/// - 读写均经过 `RwLock`; 锁中毒时直接恢复，不向上传播。
pub struct FakeClockProvider {
    current_time: RwLock<DateTime<Utc>>,
}

impl FakeClockProvider {
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        Self {
            current_time: RwLock::new(initial_time),
        }
    }

    /// 将时钟拨到 `new_time`。
    pub fn set_time(&self, new_time: DateTime<Utc>) {
        let mut time = self
            .current_time
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *time = new_time;
    }
}

impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Utc> {
        *self.current_time.read().unwrap_or_else(|e| e.into_inner())
    }
}
