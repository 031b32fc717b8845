use chartbridge_core::datafeed::entity::{
    Bar, HistoryMeta, PeriodParams, SymbolDescriptor, SymbolHints,
};
use chartbridge_core::datafeed::port::Datafeed;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::error;

/// # Summary
/// 基于 [`Datafeed`] 的续体风格封装，供以成功/失败回调
/// 而非 await future 驱动适配器的宿主使用。
///
/// # Invariants
/// - 每次调用两个续体中恰好执行一个。
/// - 每次调用运行在独立任务中，完成顺序不等于请求顺序。
pub trait DatafeedCallbackExt: Datafeed + 'static {
    /// 派生 `resolve_symbol` 任务; 错误以其显示消息交付。
    fn resolve_symbol_with<R, E>(
        self: Arc<Self>,
        ticker: String,
        hints: SymbolHints,
        on_resolve: R,
        on_error: E,
    ) -> JoinHandle<()>
    where
        R: FnOnce(SymbolDescriptor) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        tokio::spawn(async move {
            match self.resolve_symbol(&ticker, &hints).await {
                Ok(descriptor) => on_resolve(descriptor),
                Err(e) => on_error(e.to_string()),
            }
        })
    }

    /// 派生 `get_bars` 任务; 成功时交付 `(bars, meta)`。
    fn get_bars_with<H, E>(
        self: Arc<Self>,
        symbol: SymbolDescriptor,
        resolution: String,
        period: PeriodParams,
        on_history: H,
        on_error: E,
    ) -> JoinHandle<()>
    where
        H: FnOnce(Vec<Bar>, HistoryMeta) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        tokio::spawn(async move {
            match self.get_bars(&symbol, &resolution, period).await {
                Ok(page) => on_history(page.bars, page.meta),
                Err(e) => on_error(e.to_string()),
            }
        })
    }

    /// 派生 `server_time` 任务; 失败仅记录日志，不调用回调。
    fn server_time_with<C>(self: Arc<Self>, callback: C) -> JoinHandle<()>
    where
        C: FnOnce(i64) + Send + 'static,
    {
        tokio::spawn(async move {
            match self.server_time().await {
                Ok(time) => callback(time),
                Err(e) => error!(error = %e, "server time request failed"),
            }
        })
    }
}

impl<T: Datafeed + 'static> DatafeedCallbackExt for T {}
