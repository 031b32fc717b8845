use chartbridge_core::overlay::port::ChartWidget;
use std::sync::{Arc, RwLock};

/// # Summary
/// 当前活动图表组件的共享句柄。
///
/// # Invariants
/// - 克隆共享同一槽位; UI 胶水层安装组件，同步器读取组件。
/// - 锁中毒时直接恢复，不向上传播。
#[derive(Clone, Default)]
pub struct WidgetSlot {
    inner: Arc<RwLock<Option<Arc<dyn ChartWidget>>>>,
}

impl WidgetSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 安装 `widget`，返回被替换的旧组件。
    pub fn install(&self, widget: Arc<dyn ChartWidget>) -> Option<Arc<dyn ChartWidget>> {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .replace(widget)
    }

    /// 清空槽位，例如组件被销毁时。
    pub fn clear(&self) -> Option<Arc<dyn ChartWidget>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub fn current(&self) -> Option<Arc<dyn ChartWidget>> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_installed(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}
