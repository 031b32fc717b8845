use crate::http::HttpTransport;
use crate::negotiator::ConfigNegotiator;
use crate::protocol;
use async_trait::async_trait;
use chartbridge_core::config::BridgeConfig;
use chartbridge_core::datafeed::entity::{
    BarPage, FeedConfiguration, PeriodParams, QueryParams, SymbolDescriptor, SymbolHints,
};
use chartbridge_core::datafeed::error::{DatafeedError, TransportError};
use chartbridge_core::datafeed::port::{Datafeed, ReadyListener, TickCallback, Transport};
use std::sync::Arc;
use tracing::{debug, warn};

/// # Summary
/// 交给图表组件的 UDF 兼容数据源适配器。
///
/// # Invariants
/// - 构造时即开始配置协商，且仅一次。
/// - 品种与历史调用不等待协商完成，也从不缓存或合并;
///   每次调用都会到达后端。
pub struct UdfDatafeed {
    transport: Arc<dyn Transport>,
    negotiator: Arc<ConfigNegotiator>,
}

impl UdfDatafeed {
    /// # Summary
    /// 构建适配器并开始配置协商。
    ///
    /// # Arguments
    /// * `transport`: 后端传输层。
    ///
    /// # Returns
    /// 适配器，须在 tokio 运行时内调用。
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let negotiator = ConfigNegotiator::spawn(Arc::clone(&transport));
        Self {
            transport,
            negotiator,
        }
    }

    /// 由 `config.datafeed_url` 与 `config.headers` 构建基于 HTTP 的适配器。
    pub fn from_config(config: &BridgeConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::with_headers(&config.datafeed_url, &config.headers)?;
        Ok(Self::new(Arc::new(transport)))
    }

    pub fn negotiator(&self) -> &ConfigNegotiator {
        &self.negotiator
    }

    /// 协商后的配置; 会等待协商完成。
    pub async fn configuration(&self) -> FeedConfiguration {
        self.negotiator.configuration().await
    }
}

#[async_trait]
impl Datafeed for UdfDatafeed {
    fn on_ready(&self, listener: ReadyListener) {
        self.negotiator.on_ready(listener);
    }

    /// # Summary
    /// 通过 `/symbols` 解析 `ticker`。
    ///
    /// # Logic
    /// 1. 发送 `symbol`，仅在有提示时附带 `currency_code` / `unit_id`。
    /// 2. 用 [`protocol::parse_symbol`] 解码。
    async fn resolve_symbol(
        &self,
        ticker: &str,
        hints: &SymbolHints,
    ) -> Result<SymbolDescriptor, DatafeedError> {
        let params = QueryParams::new()
            .with("symbol", ticker)
            .with_opt("currency_code", hints.currency_code.clone())
            .with_opt("unit_id", hints.unit_id.clone());

        let body = self.transport.send("symbols", &params).await?;
        protocol::parse_symbol(body).inspect_err(|e| {
            warn!(ticker, error = %e, "symbol resolution failed");
        })
    }

    /// # Summary
    /// 通过 `/history` 获取一页 K 线。
    ///
    /// # Logic
    /// 1. 发送 `symbol`、`resolution`、`from`、`to`，设置了 `countback` 时一并发送。
    /// 2. 用 [`protocol::parse_history`] 解码。
    async fn get_bars(
        &self,
        symbol: &SymbolDescriptor,
        resolution: &str,
        period: PeriodParams,
    ) -> Result<BarPage, DatafeedError> {
        let params = QueryParams::new()
            .with("symbol", symbol.history_symbol())
            .with("resolution", resolution)
            .with("from", period.from)
            .with("to", period.to)
            .with_opt("countback", period.count_back);
        debug!(
            symbol = symbol.history_symbol(),
            resolution,
            from = period.from,
            to = period.to,
            countback = ?period.count_back,
            "history request"
        );

        let body = self.transport.send("history", &params).await?;
        match protocol::parse_history(&body) {
            Ok(page) if page.meta.no_data => {
                debug!(next_time = ?page.meta.next_time, "no data in requested range");
                Ok(page)
            }
            Ok(page) => {
                debug!(bars = page.bars.len(), next_time = ?page.meta.next_time, "history page received");
                Ok(page)
            }
            Err(e) => {
                warn!(error = %e, "history request failed");
                Err(e)
            }
        }
    }

    /// 不推送实时更新; 不登记任何订阅，`on_tick` 永不调用。
    fn subscribe_bars(
        &self,
        symbol: &SymbolDescriptor,
        resolution: &str,
        _on_tick: TickCallback,
        subscriber_uid: &str,
    ) {
        debug!(
            symbol = symbol.history_symbol(),
            resolution, subscriber_uid, "realtime subscription ignored"
        );
    }

    fn unsubscribe_bars(&self, subscriber_uid: &str) {
        debug!(subscriber_uid, "realtime unsubscription ignored");
    }

    async fn server_time(&self) -> Result<i64, DatafeedError> {
        let body = self.transport.send("time", &QueryParams::new()).await?;
        protocol::parse_server_time(&body)
    }
}
