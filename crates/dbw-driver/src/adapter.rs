//! 线控适配器核心
//!
//! [`DbwContext`] 持有全部共享可变状态（三路通道 + 超时计数），由一把
//! `parking_lot::Mutex` 串行化：指令写入、看门狗推进、编码读取、路由读取使能标志
//! 互不交错。[`DbwAdapter`] 是对外的事件接口，不涉及线程与总线，
//! 可以由任何调度器（`DbwDriver` 的 tick 线程或测试代码）直接驱动。

use crate::channel::{Channel, ChannelSet, ChannelSnapshot};
use crate::command::{DbwCommand, TickFrames};
use crate::config::{ConfigError, DbwConfig};
use crate::encoder::encode_channels;
use crate::ingress::{self, IngressOutcome};
use crate::metrics::{DbwMetrics, MetricsSnapshot};
use crate::report::ReportSink;
use crate::router::{self, RouteOutcome};
use crate::watchdog::age;
use dbw_can::DbwFrame;
use dbw_protocol::FeedbackIds;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::trace;

/// 共享状态上下文
#[derive(Debug)]
pub struct DbwContext {
    config: DbwConfig,
    feedback_ids: FeedbackIds,
    channels: Mutex<ChannelSet>,
    metrics: DbwMetrics,
}

impl DbwContext {
    /// 校验配置并创建上下文（所有通道初始为 Disabled）
    pub fn new(config: DbwConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            feedback_ids: config.feedback_ids(),
            config,
            channels: Mutex::new(ChannelSet::new()),
            metrics: DbwMetrics::new(),
        })
    }

    pub fn config(&self) -> &DbwConfig {
        &self.config
    }

    pub fn feedback_ids(&self) -> &FeedbackIds {
        &self.feedback_ids
    }

    pub fn metrics(&self) -> &DbwMetrics {
        &self.metrics
    }

    /// 锁定通道状态
    pub(crate) fn channels(&self) -> MutexGuard<'_, ChannelSet> {
        self.channels.lock()
    }
}

/// 线控适配器（事件接口）
///
/// 克隆开销很低（共享同一个 `DbwContext`），可以分别交给指令线程、tick 线程和 RX 线程。
///
/// # 示例
///
/// ```
/// use dbw_driver::{DbwAdapter, DbwCommand, DbwConfig};
///
/// let adapter = DbwAdapter::new(DbwConfig::default()).unwrap();
/// adapter.on_command(DbwCommand::throttle(true, 150.0));
///
/// let frames = adapter.on_tick(0);
/// // 制动、油门、转向
/// assert_eq!(frames.len(), 3);
/// assert_eq!(frames[1].data[3], 100);
/// ```
#[derive(Debug, Clone)]
pub struct DbwAdapter {
    ctx: Arc<DbwContext>,
}

impl DbwAdapter {
    pub fn new(config: DbwConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_context(Arc::new(DbwContext::new(config)?)))
    }

    pub fn from_context(ctx: Arc<DbwContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<DbwContext> {
        &self.ctx
    }

    pub fn config(&self) -> &DbwConfig {
        self.ctx.config()
    }

    /// 处理一条上游指令（限幅、写入、清零超时）
    pub fn on_command(&self, cmd: DbwCommand) -> IngressOutcome {
        ingress::apply_command(&self.ctx, cmd)
    }

    /// 执行一个 tick：先编码，后推进看门狗
    ///
    /// 两步在同一次加锁内完成。超时前的最后一个 tick 仍然发送有效的指令值，
    /// 禁用从下一个 tick 开始生效。
    pub fn on_tick(&self, now_us: u64) -> TickFrames {
        let (frames, tripped) = {
            let mut channels = self.ctx.channels();
            let frames = encode_channels(&channels, &self.ctx.config().can_ids, now_us);
            let tripped = age(&mut channels, self.ctx.config().timeout_ticks);
            (frames, tripped)
        };

        let metrics = self.ctx.metrics();
        DbwMetrics::incr(&metrics.ticks);
        for _ in &tripped {
            DbwMetrics::incr(&metrics.watchdog_trips);
        }
        trace!("Tick encoded {} frames", frames.len());
        frames
    }

    /// 处理一个入站帧，生成的报告投递给 `sink`
    pub fn on_frame<S>(&self, frame: &DbwFrame, now_us: u64, sink: &mut S) -> RouteOutcome
    where
        S: ReportSink + ?Sized,
    {
        router::dispatch(&self.ctx, frame, now_us, sink)
    }

    /// 通道快照
    pub fn channel(&self, channel: Channel) -> ChannelSnapshot {
        self.ctx.channels().snapshot(channel)
    }

    /// 指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::FeedbackReport;
    use dbw_protocol::{BRAKE_FEEDBACK_SOURCE_ID, DEFAULT_FEEDBACK_CAN_ID};

    #[test]
    fn test_invalid_config_rejected() {
        let config = DbwConfig {
            timeout_ticks: 0,
            ..DbwConfig::default()
        };
        assert!(DbwAdapter::new(config).is_err());
    }

    #[test]
    fn test_last_frame_before_timeout_is_valid() {
        let adapter = DbwAdapter::new(DbwConfig::default()).unwrap();
        adapter.on_command(DbwCommand::brake(true, 40.0));

        // 阈值 3：前三个 tick 都发送 40，第三个 tick 之后禁用
        for _ in 0..3 {
            assert_eq!(adapter.on_tick(0)[0].data[3], 40);
        }
        assert!(!adapter.channel(Channel::Brake).is_enabled());
        assert_eq!(adapter.on_tick(0)[0].data[3], 0);
    }

    #[test]
    fn test_metrics_track_events() {
        let adapter = DbwAdapter::new(DbwConfig::default()).unwrap();
        adapter.on_command(DbwCommand::steering(true, 1000.0));
        adapter.on_command(DbwCommand::steering(true, 10.0));
        adapter.on_tick(0);

        let mut reports: Vec<FeedbackReport> = Vec::new();
        let frame =
            DbwFrame::new_extended(DEFAULT_FEEDBACK_CAN_ID, &[BRAKE_FEEDBACK_SOURCE_ID, 0, 5]);
        adapter.on_frame(&frame, 1, &mut reports);
        adapter.on_frame(&DbwFrame::new_extended(0x123, &[]), 1, &mut reports);

        let metrics = adapter.metrics();
        assert_eq!(metrics.commands_clamped, 1);
        assert_eq!(metrics.ticks, 1);
        assert_eq!(metrics.reports_published, 1);
        assert_eq!(metrics.rx_frames_ignored, 1);
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let adapter = DbwAdapter::new(DbwConfig::default()).unwrap();
        let other = adapter.clone();
        other.on_command(DbwCommand::throttle(true, 12.0));

        let snap = adapter.channel(Channel::Throttle);
        assert!(snap.is_enabled());
        assert_eq!(snap.value, 12.0);
    }
}
