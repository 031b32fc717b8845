//! # `chartbridge-overlay`
//!
//! 在图表组件存在且图表就绪后，将回测事件绘制到图表上。
//! 每个事件独立转换与提交; 单个异常事件或被拒图形
//! 不会中断批次中的其余事件。

pub mod marker;
pub mod retry;
pub mod slot;
pub mod sync;
