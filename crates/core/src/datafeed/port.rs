use crate::datafeed::entity::{
    Bar, BarPage, FeedConfiguration, PeriodParams, QueryParams, SymbolDescriptor, SymbolHints,
};
use crate::datafeed::error::{DatafeedError, TransportError};
use async_trait::async_trait;
use serde_json::Value;

/// 通过 [`Datafeed::on_ready`] 注册的监听器，仅接收一次协商后的配置。
pub type ReadyListener = Box<dyn FnOnce(FeedConfiguration) + Send>;

/// 传给 [`Datafeed::subscribe_bars`] 的实时行情回调。
pub type TickCallback = Box<dyn Fn(Bar) + Send + Sync>;

/// # Summary
/// 面向 UDF 后端的请求/响应原语 (Port)。
///
/// # Invariants
/// - 不重试也不设超时，该策略由调用方负责。
/// - 非 JSON 响应一律返回错误，而非哨兵值。
#[async_trait]
pub trait Transport: Send + Sync {
    /// # Summary
    /// 以 `params` 调用 `endpoint` 并返回解析后的 JSON 响应体。
    ///
    /// # Logic
    /// 1. 将每个参数 URL 编码进查询字符串。
    /// 2. 发起请求并读取响应体。
    /// 3. 将响应体解析为 JSON。
    ///
    /// # Arguments
    /// * `endpoint`: 相对基础地址的接口名，例如 `history`。
    /// * `params`: 扁平查询参数。
    ///
    /// # Returns
    /// 解析后的响应体; 调用未完成时返回 `TransportError::Network`，
    /// 响应体不是 JSON 时返回 `TransportError::Parse`。
    async fn send(&self, endpoint: &str, params: &QueryParams) -> Result<Value, TransportError>;
}

/// # Summary
/// 图表组件驱动的数据访问契约 (Port)。
///
/// # Invariants
/// - 配置就绪前即可调用 `resolve_symbol` 与 `get_bars`。
/// - `subscribe_bars` / `unsubscribe_bars` 允许为空操作。
#[async_trait]
pub trait Datafeed: Send + Sync {
    /// # Summary
    /// 注册协商配置的监听器。
    ///
    /// # Logic
    /// 1. 协商完成前，将监听器加入队列。
    /// 2. 协商完成后，立即调用。
    ///
    /// # Arguments
    /// * `listener`: 恰好调用一次。
    fn on_ready(&self, listener: ReadyListener);

    /// # Summary
    /// 将代码解析为后端的品种描述。
    ///
    /// # Arguments
    /// * `ticker`: 用户输入的代码。
    /// * `hints`: 可选的币种/单位提示。
    ///
    /// # Returns
    /// 品种描述，或 `DatafeedError` (协议错误携带后端消息)。
    async fn resolve_symbol(
        &self,
        ticker: &str,
        hints: &SymbolHints,
    ) -> Result<SymbolDescriptor, DatafeedError>;

    /// # Summary
    /// 获取一页 K 线。
    ///
    /// # Arguments
    /// * `symbol`: 已解析的品种描述。
    /// * `resolution`: UDF 周期标记。
    /// * `period`: 请求的时间窗口或回溯数量。
    ///
    /// # Returns
    /// `BarPage`; "无数据" 是带标记的成功结果，不是错误。
    async fn get_bars(
        &self,
        symbol: &SymbolDescriptor,
        resolution: &str,
        period: PeriodParams,
    ) -> Result<BarPage, DatafeedError>;

    /// 注册实时订阅。
    fn subscribe_bars(
        &self,
        symbol: &SymbolDescriptor,
        resolution: &str,
        on_tick: TickCallback,
        subscriber_uid: &str,
    );

    /// 取消实时订阅; 未知 id 不算错误。
    fn unsubscribe_bars(&self, subscriber_uid: &str);

    /// 后端时间，epoch 秒。
    async fn server_time(&self) -> Result<i64, DatafeedError>;
}
