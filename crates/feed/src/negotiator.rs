use chartbridge_core::datafeed::entity::{FeedConfiguration, QueryParams};
use chartbridge_core::datafeed::port::{ReadyListener, Transport};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 配置拉取的生命周期。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationPhase {
    Uninitialized,
    Fetching,
    Ready,
}

struct NegotiatorState {
    phase: NegotiationPhase,
    config: Option<FeedConfiguration>,
    // 拉取完成前排队，按注册顺序取出
    listeners: Vec<ReadyListener>,
}

/// # Summary
/// 只拉取一次后端能力集并缓存。
///
/// # Invariants
/// - 配置恰好写入一次; `Ready` 为终态。
/// - 每个监听器恰好调用一次。
/// - 拉取失败时得到 `FeedConfiguration::default()`，从不返回错误。
pub struct ConfigNegotiator {
    state: Mutex<NegotiatorState>,
    ready_tx: watch::Sender<Option<FeedConfiguration>>,
}

impl ConfigNegotiator {
    /// 创建空闲的协商器; 调用 [`ConfigNegotiator::start`] 前不会拉取。
    pub fn new() -> Arc<Self> {
        let (ready_tx, _) = watch::channel(None);
        Arc::new(Self {
            state: Mutex::new(NegotiatorState {
                phase: NegotiationPhase::Uninitialized,
                config: None,
                listeners: Vec::new(),
            }),
            ready_tx,
        })
    }

    /// # Summary
    /// 创建协商器并立即开始拉取 `/config`。
    ///
    /// # Arguments
    /// * `transport`: 后端传输层。
    ///
    /// # Returns
    /// 共享的协商器，须在 tokio 运行时内调用。
    pub fn spawn(transport: Arc<dyn Transport>) -> Arc<Self> {
        let negotiator = Self::new();
        negotiator.start(transport);
        negotiator
    }

    /// # Summary
    /// 从 `Uninitialized` 转入 `Fetching` 并派生拉取任务。
    ///
    /// # Logic
    /// 1. 仅在 `Uninitialized` 阶段生效，否则忽略。
    /// 2. 派生任务: 拉取，失败时回退默认值，然后完成。
    pub fn start(self: &Arc<Self>, transport: Arc<dyn Transport>) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.phase != NegotiationPhase::Uninitialized {
                debug!("configuration negotiation already started");
                return;
            }
            state.phase = NegotiationPhase::Fetching;
        }

        let negotiator = Arc::clone(self);
        tokio::spawn(async move {
            let config = fetch_configuration(transport.as_ref()).await;
            negotiator.complete(config);
        });
    }

    /// # Summary
    /// 注册协商配置的监听器。
    ///
    /// # Logic
    /// 1. 未就绪时将监听器入队。
    /// 2. 已就绪时立即调用 (在锁外)。
    pub fn on_ready(&self, listener: ReadyListener) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(config) = state.config.clone() {
            drop(state);
            listener(config);
            return;
        }
        state.listeners.push(listener);
    }

    /// 协商完成后返回配置。
    pub async fn configuration(&self) -> FeedConfiguration {
        let mut rx = self.ready_tx.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(config) => config.clone().unwrap_or_default(),
            // sender 与 self 同生命周期
            Err(_) => FeedConfiguration::default(),
        }
    }

    /// 已缓存的配置 (协商完成后才有)。
    pub fn current(&self) -> Option<FeedConfiguration> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .config
            .clone()
    }

    pub fn phase(&self) -> NegotiationPhase {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).phase
    }

    /// # Summary
    /// 保存配置并通知监听器。
    ///
    /// # Logic
    /// 1. 持锁: 拒绝二次写入，置为 `Ready` 并取出队列。
    /// 2. 先在 watch 通道上发布，即使监听器 panic
    ///    异步等待方也能返回。
    /// 3. 按注册顺序调用排队的监听器。
    fn complete(&self, config: FeedConfiguration) {
        let listeners = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.config.is_some() {
                warn!("configuration already negotiated, ignoring second result");
                return;
            }
            state.config = Some(config.clone());
            state.phase = NegotiationPhase::Ready;
            std::mem::take(&mut state.listeners)
        };

        info!(
            resolutions = ?config.supported_resolutions,
            listeners = listeners.len(),
            "datafeed configuration ready"
        );
        self.ready_tx.send_replace(Some(config.clone()));
        for listener in listeners {
            listener(config.clone());
        }
    }
}

/// # Summary
/// 调用 `/config` 并解码，任何失败都以默认值替代。
async fn fetch_configuration(transport: &dyn Transport) -> FeedConfiguration {
    match transport.send("config", &QueryParams::new()).await {
        Ok(Value::Null) => {
            warn!("configuration response was null, using defaults");
            FeedConfiguration::default()
        }
        Ok(value) => match serde_json::from_value::<FeedConfiguration>(value) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "configuration response malformed, using defaults");
                FeedConfiguration::default()
            }
        },
        Err(e) => {
            warn!(error = %e, "configuration request failed, using defaults");
            FeedConfiguration::default()
        }
    }
}
