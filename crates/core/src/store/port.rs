use super::error::StoreError;
use crate::market::entity::Candle;
use async_trait::async_trait;

/// # Summary
/// UDF 后端的 K 线数据来源 (Port)。
///
/// # Invariants
/// - 返回的 K 线按时间排序，且时间戳不重复。
#[async_trait]
pub trait BarStore: Send + Sync {
    /// # Summary
    /// 按源数据周期加载 `symbol` 的全部 K 线。
    ///
    /// # Arguments
    /// * `symbol`: 请求的代码; 单品种存储可忽略。
    ///
    /// # Returns
    /// K 线 (可能为空)，或 `StoreError`。
    async fn load(&self, symbol: &str) -> Result<Vec<Candle>, StoreError>;
}
