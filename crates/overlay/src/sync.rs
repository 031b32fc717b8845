use crate::marker::build_marker;
use crate::retry::{RetryPolicy, wait_for_widget};
use crate::slot::WidgetSlot;
use chartbridge_core::overlay::entity::{
    BacktestEvent, DrawPhase, DrawReport, FailedSubmission, OverlayMarker, SkippedEvent,
    SubmittedMarker,
};
use chartbridge_core::overlay::error::{OverlayError, WidgetError};
use chartbridge_core::overlay::port::ChartWidget;
use futures::future::join_all;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// # Summary
/// 将成批回测事件绘制到槽位当前持有的组件上。
///
/// # Invariants
/// - 组件存在且报告图表就绪前不绘制任何内容。
/// - 等待受 [`RetryPolicy`] 约束，不存在无限轮询。
/// - 异常事件或被拒图形只影响报告中自己的条目。
#[derive(Clone)]
pub struct MarkerSynchronizer {
    slot: WidgetSlot,
    policy: RetryPolicy,
}

impl MarkerSynchronizer {
    pub fn new(slot: WidgetSlot, policy: RetryPolicy) -> Self {
        Self { slot, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// # Summary
    /// 在当前任务中执行一轮绘制。
    ///
    /// # Arguments
    /// * `events`: 按推送顺序排列的回测事件; 报告中的下标指向此切片。
    ///
    /// # Returns
    /// 逐事件报告，或整轮无法开始的原因。
    pub async fn draw(&self, events: &[BacktestEvent]) -> Result<DrawReport, OverlayError> {
        let (phase_tx, _) = watch::channel(DrawPhase::WaitingForWidget);
        run_pass(&self.slot, &self.policy, events, &phase_tx).await
    }

    /// # Summary
    /// 以后台任务执行一轮绘制。
    ///
    /// # Returns
    /// 可观察阶段、取消或等待报告的句柄。
    pub fn spawn_draw(&self, events: Vec<BacktestEvent>) -> DrawHandle {
        let (phase_tx, phase_rx) = watch::channel(DrawPhase::WaitingForWidget);
        let slot = self.slot.clone();
        let policy = self.policy;
        let task =
            tokio::spawn(async move { run_pass(&slot, &policy, &events, &phase_tx).await });
        DrawHandle {
            task,
            phase: phase_rx,
        }
    }

    /// 移除已安装组件上的全部图形。
    pub async fn clear(&self) -> Result<(), WidgetError> {
        let widget = self.slot.current().ok_or(WidgetError::Unavailable)?;
        widget.remove_all_shapes().await?;
        info!("chart markers cleared");
        Ok(())
    }
}

/// # Summary
/// 由 [`MarkerSynchronizer::spawn_draw`] 启动的绘制任务句柄。
///
/// # Invariants
/// - `cancel` 在下一个 await 点停止绘制;
///   组件已接受的标记保持不变。
pub struct DrawHandle {
    task: JoinHandle<Result<DrawReport, OverlayError>>,
    phase: watch::Receiver<DrawPhase>,
}

impl DrawHandle {
    /// 绘制任务最近上报的阶段。
    pub fn phase(&self) -> DrawPhase {
        *self.phase.borrow()
    }

    /// 可观察后续每次阶段变化的接收端。
    pub fn phases(&self) -> watch::Receiver<DrawPhase> {
        self.phase.clone()
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// 等待绘制结束; 被取消时返回 `OverlayError::Cancelled`，
    /// panic 时返回 `OverlayError::Aborted`。
    pub async fn wait(self) -> Result<DrawReport, OverlayError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                debug!("draw pass cancelled");
                Err(OverlayError::Cancelled)
            }
            Err(e) => {
                error!(error = %e, "draw pass panicked");
                Err(OverlayError::Aborted(e.to_string()))
            }
        }
    }
}

/// # Summary
/// 等待组件及其图表就绪，然后并发提交图形。
///
/// # Logic
/// 1. `WaitingForWidget`: 按策略轮询槽位。
/// 2. `WaitingForChartReady`: 注册一次性就绪回调。
/// 3. 步骤 1 与 2 共享策略的总超时。
/// 4. `Drawing`: 转换每个事件，并发提交可转换的事件。
/// 5. `Done`: 记录汇总日志。
async fn run_pass(
    slot: &WidgetSlot,
    policy: &RetryPolicy,
    events: &[BacktestEvent],
    phase: &watch::Sender<DrawPhase>,
) -> Result<DrawReport, OverlayError> {
    phase.send_replace(DrawPhase::WaitingForWidget);
    let waiting = async {
        let widget = wait_for_widget(slot, policy).await?;
        phase.send_replace(DrawPhase::WaitingForChartReady);
        wait_chart_ready(widget.as_ref()).await?;
        Ok::<_, OverlayError>(widget)
    };
    let widget = match tokio::time::timeout(policy.timeout, waiting).await {
        Ok(result) => result.inspect_err(|e| warn!(error = %e, "draw pass aborted"))?,
        Err(_) => {
            warn!(timeout = ?policy.timeout, "timed out waiting for the chart widget");
            return Err(OverlayError::Timeout(policy.timeout));
        }
    };

    phase.send_replace(DrawPhase::Drawing);
    let report = submit_markers(widget.as_ref(), events).await;
    phase.send_replace(DrawPhase::Done);

    info!(
        events = events.len(),
        submitted = report.submitted.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "backtest markers drawn"
    );
    Ok(report)
}

async fn wait_chart_ready(widget: &dyn ChartWidget) -> Result<(), OverlayError> {
    let (tx, rx) = oneshot::channel();
    widget.on_chart_ready(Box::new(move || {
        if tx.send(()).is_err() {
            debug!("chart became ready after the draw pass stopped waiting");
        }
    }));
    rx.await.map_err(|_| OverlayError::ReadinessDropped)
}

async fn submit_markers(widget: &dyn ChartWidget, events: &[BacktestEvent]) -> DrawReport {
    let mut report = DrawReport::default();
    let mut markers: Vec<(usize, OverlayMarker)> = Vec::with_capacity(events.len());

    for (index, event) in events.iter().enumerate() {
        match build_marker(event) {
            Ok(marker) => markers.push((index, marker)),
            Err(reason) => {
                warn!(index, event_type = %event.event_type, ?reason, "skipping backtest event");
                report.skipped.push(SkippedEvent { index, reason });
            }
        }
    }

    let outcomes = join_all(markers.iter().map(|(index, marker)| async move {
        (*index, widget.create_shape(marker).await)
    }))
    .await;

    for (index, outcome) in outcomes {
        match outcome {
            Ok(shape_id) => report.submitted.push(SubmittedMarker { index, shape_id }),
            Err(error) => {
                warn!(index, error = %error, "chart widget rejected marker");
                report.failed.push(FailedSubmission { index, error });
            }
        }
    }
    report
}
