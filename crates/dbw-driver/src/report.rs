//! 反馈报告与报告接收端
//!
//! 每个被识别的入站反馈帧生成一份新的报告，通过 [`ReportSink`] 投递给上游。

use crossbeam_channel::{Sender, TrySendError};
use tracing::warn;

/// 油门反馈报告
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ThrottleReport {
    /// 油门通道当前是否使能
    pub enabled: bool,
    /// 实测踏板开度（原始值，可能超过上限）
    pub pedal_input: u8,
    pub override_active: bool,
    pub timestamp_us: u64,
}

/// 制动反馈报告
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BrakeReport {
    pub enabled: bool,
    pub pedal_input: u8,
    pub override_active: bool,
    pub timestamp_us: u64,
}

/// 转向反馈报告
///
/// 执行器尚未提供测量值，三个测量字段固定为 `STEERING_UNKNOWN`（0.0）。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SteeringReport {
    pub enabled: bool,
    pub steering_wheel_angle: f32,
    pub steering_wheel_angle_velocity: f32,
    pub steering_wheel_torque: f32,
    pub override_active: bool,
    pub timestamp_us: u64,
}

/// 反馈报告
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum FeedbackReport {
    Throttle(ThrottleReport),
    Brake(BrakeReport),
    Steering(SteeringReport),
}

impl FeedbackReport {
    pub fn timestamp_us(&self) -> u64 {
        match self {
            FeedbackReport::Throttle(r) => r.timestamp_us,
            FeedbackReport::Brake(r) => r.timestamp_us,
            FeedbackReport::Steering(r) => r.timestamp_us,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            FeedbackReport::Throttle(r) => r.enabled,
            FeedbackReport::Brake(r) => r.enabled,
            FeedbackReport::Steering(r) => r.enabled,
        }
    }
}

/// 报告接收端
///
/// 在 RX 线程中调用，实现必须非阻塞（推荐 `try_send`）。
///
/// 已提供的实现：
/// - `crossbeam_channel::Sender<FeedbackReport>`：通道满或断开时丢弃并告警
/// - `FnMut(FeedbackReport)` 闭包
/// - `Vec<FeedbackReport>`：测试用
pub trait ReportSink {
    /// 投递一份报告，返回是否被接收
    fn publish(&mut self, report: FeedbackReport) -> bool;
}

impl ReportSink for Sender<FeedbackReport> {
    fn publish(&mut self, report: FeedbackReport) -> bool {
        match self.try_send(report) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Report channel full, dropping feedback report");
                false
            },
            Err(TrySendError::Disconnected(_)) => {
                warn!("Report channel disconnected, dropping feedback report");
                false
            },
        }
    }
}

impl<F> ReportSink for F
where
    F: FnMut(FeedbackReport),
{
    fn publish(&mut self, report: FeedbackReport) -> bool {
        self(report);
        true
    }
}

impl ReportSink for Vec<FeedbackReport> {
    fn publish(&mut self, report: FeedbackReport) -> bool {
        self.push(report);
        true
    }
}
