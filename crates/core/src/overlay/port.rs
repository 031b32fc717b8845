use crate::overlay::entity::{OverlayMarker, ShapeId};
use crate::overlay::error::WidgetError;
use async_trait::async_trait;

/// 图表就绪后组件触发的一次性回调。
pub type ChartReadyCallback = Box<dyn FnOnce() + Send>;

/// # Summary
/// 外部图表组件的绘图面 (Port)。
///
/// # Invariants
/// - `on_chart_ready` 至多调用一次回调;
///   图表已就绪时可立即调用。
/// - `create_shape` 调用相互独立，一次拒绝不影响其他调用。
#[async_trait]
pub trait ChartWidget: Send + Sync {
    /// 注册图表就绪回调。
    fn on_chart_ready(&self, callback: ChartReadyCallback);

    /// # Summary
    /// 绘制一个标记。
    ///
    /// # Arguments
    /// * `marker`: 锚点、图形、颜色与文字。
    ///
    /// # Returns
    /// 组件为新图形分配的 id，或 `WidgetError::Rejected`。
    async fn create_shape(&self, marker: &OverlayMarker) -> Result<ShapeId, WidgetError>;

    /// 移除此前绘制的全部图形。
    async fn remove_all_shapes(&self) -> Result<(), WidgetError>;
}
