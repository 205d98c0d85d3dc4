//! 运行指标
//!
//! 原子计数器，热路径只做 `fetch_add(Relaxed)`；读取时通过 `snapshot()` 取一致性要求不高的快照。

use std::sync::atomic::{AtomicU64, Ordering};

/// 运行指标（原子计数器）
#[derive(Debug, Default)]
pub struct DbwMetrics {
    /// 成功发送的控制帧
    pub tx_frames_total: AtomicU64,
    /// 发送失败次数
    pub tx_errors: AtomicU64,
    /// 接收到的帧（含被过滤的帧）
    pub rx_frames_total: AtomicU64,
    /// 被 ID 过滤、错误帧/远程帧或长度不足而忽略的帧
    pub rx_frames_ignored: AtomicU64,
    /// 接收超时次数
    pub rx_timeouts: AtomicU64,
    /// 已投递的反馈报告
    pub reports_published: AtomicU64,
    /// 反馈踏板值超过上限的次数（仍然投递）
    pub feedback_over_max: AtomicU64,
    /// 未知反馈源
    pub unknown_sources: AtomicU64,
    /// 被限幅的指令
    pub commands_clamped: AtomicU64,
    /// 看门狗触发（超时禁用）次数
    pub watchdog_trips: AtomicU64,
    /// 已执行的 tick
    pub ticks: AtomicU64,
}

impl DbwMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tx_frames_total: self.tx_frames_total.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
            rx_frames_total: self.rx_frames_total.load(Ordering::Relaxed),
            rx_frames_ignored: self.rx_frames_ignored.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            reports_published: self.reports_published.load(Ordering::Relaxed),
            feedback_over_max: self.feedback_over_max.load(Ordering::Relaxed),
            unknown_sources: self.unknown_sources.load(Ordering::Relaxed),
            commands_clamped: self.commands_clamped.load(Ordering::Relaxed),
            watchdog_trips: self.watchdog_trips.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MetricsSnapshot {
    pub tx_frames_total: u64,
    pub tx_errors: u64,
    pub rx_frames_total: u64,
    pub rx_frames_ignored: u64,
    pub rx_timeouts: u64,
    pub reports_published: u64,
    pub feedback_over_max: u64,
    pub unknown_sources: u64,
    pub commands_clamped: u64,
    pub watchdog_trips: u64,
    pub ticks: u64,
}

impl MetricsSnapshot {
    /// 发送失败率（0.0 - 1.0）
    pub fn tx_error_rate(&self) -> f64 {
        let attempts = self.tx_frames_total + self.tx_errors;
        if attempts == 0 {
            0.0
        } else {
            self.tx_errors as f64 / attempts as f64
        }
    }
}
