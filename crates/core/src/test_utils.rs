//! 各 crate 集成测试共用的手写端口替身。
//! 通过 `test-utils` feature 启用。

use crate::datafeed::entity::QueryParams;
use crate::datafeed::error::TransportError;
use crate::datafeed::port::Transport;
use crate::market::entity::Candle;
use crate::overlay::entity::{OverlayMarker, ShapeId};
use crate::overlay::error::WidgetError;
use crate::overlay::port::{ChartReadyCallback, ChartWidget};
use crate::store::error::StoreError;
use crate::store::port::BarStore;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// # Summary
/// 按接口脚本应答并记录每次调用的 `Transport`。
///
/// # Invariants
/// - 排队的响应按序消费，最后一个会一直重复。
/// - 被挂起的接口会阻塞到调用 `release` 为止 (调用开始前后均可)。
#[derive(Default)]
pub struct ScriptedTransport {
    responses: DashMap<String, VecDeque<Result<Value, TransportError>>>,
    gates: DashMap<String, Arc<Notify>>,
    calls: Mutex<Vec<(String, QueryParams)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为 `endpoint` 排入一个响应。
    pub fn respond(&self, endpoint: &str, response: Result<Value, TransportError>) -> &Self {
        self.responses
            .entry(endpoint.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// 使对 `endpoint` 的调用等待 [`ScriptedTransport::release`]。
    pub fn hold(&self, endpoint: &str) {
        self.gates
            .insert(endpoint.to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, endpoint: &str) {
        if let Some(gate) = self.gates.get(endpoint) {
            gate.notify_one();
        }
    }

    /// 迄今收到的全部调用，按顺序排列。
    pub fn calls(&self) -> Vec<(String, QueryParams)> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls().iter().filter(|(e, _)| e == endpoint).count()
    }

    fn next_response(&self, endpoint: &str) -> Result<Value, TransportError> {
        let mut queue = match self.responses.get_mut(endpoint) {
            Some(queue) => queue,
            None => {
                return Err(TransportError::Network(format!(
                    "no scripted response for {}",
                    endpoint
                )));
            }
        };
        if queue.len() > 1 {
            if let Some(front) = queue.pop_front() {
                return front;
            }
        }
        queue.front().cloned().unwrap_or_else(|| {
            Err(TransportError::Network(format!(
                "no scripted response for {}",
                endpoint
            )))
        })
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, endpoint: &str, params: &QueryParams) -> Result<Value, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((endpoint.to_string(), params.clone()));

        let gate = self.gates.get(endpoint).map(|g| g.value().clone());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.next_response(endpoint)
    }
}

type RejectRule = Box<dyn Fn(&OverlayMarker) -> bool + Send + Sync>;

/// # Summary
/// 内存版 `ChartWidget`，图表就绪信号需手动触发。
pub struct MockWidget {
    ready: AtomicBool,
    drop_ready_callbacks: bool,
    callbacks: Mutex<Vec<ChartReadyCallback>>,
    reject: RejectRule,
    shapes: Mutex<Vec<OverlayMarker>>,
    next_id: AtomicU64,
}

impl MockWidget {
    /// 图表尚未就绪的组件。
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            drop_ready_callbacks: false,
            callbacks: Mutex::new(Vec::new()),
            reject: Box::new(|_| false),
            shapes: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 图表已就绪的组件。
    pub fn ready() -> Self {
        let widget = Self::new();
        widget.ready.store(true, Ordering::SeqCst);
        widget
    }

    /// 拒绝所有匹配 `rule` 的标记。
    pub fn rejecting(mut self, rule: impl Fn(&OverlayMarker) -> bool + Send + Sync + 'static) -> Self {
        self.reject = Box::new(rule);
        self
    }

    /// 直接丢弃就绪回调而不保存。
    pub fn dropping_ready_callbacks(mut self) -> Self {
        self.drop_ready_callbacks = true;
        self
    }

    /// 标记图表就绪并触发所有挂起的回调。
    pub fn fire_chart_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
        let pending: Vec<ChartReadyCallback> = self
            .callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for callback in pending {
            callback();
        }
    }

    /// 迄今已接受的标记。
    pub fn shapes(&self) -> Vec<OverlayMarker> {
        self.shapes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn pending_ready_callbacks(&self) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl Default for MockWidget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChartWidget for MockWidget {
    fn on_chart_ready(&self, callback: ChartReadyCallback) {
        if self.drop_ready_callbacks {
            return;
        }
        if self.ready.load(Ordering::SeqCst) {
            callback();
            return;
        }
        self.callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(callback);
    }

    async fn create_shape(&self, marker: &OverlayMarker) -> Result<ShapeId, WidgetError> {
        if (self.reject)(marker) {
            return Err(WidgetError::Rejected(marker.text.clone()));
        }
        self.shapes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(marker.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(ShapeId(format!("shape-{}", id)))
    }

    async fn remove_all_shapes(&self) -> Result<(), WidgetError> {
        self.shapes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        Ok(())
    }
}

/// 基于固定 K 线列表的 `BarStore`。
#[derive(Default)]
pub struct MemBarStore {
    candles: Vec<Candle>,
}

impl MemBarStore {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }
}

#[async_trait]
impl BarStore for MemBarStore {
    async fn load(&self, _symbol: &str) -> Result<Vec<Candle>, StoreError> {
        Ok(self.candles.clone())
    }
}
