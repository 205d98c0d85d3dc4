//! 指令与帧缓冲类型定义

use crate::channel::Channel;
use dbw_can::DbwFrame;
use smallvec::SmallVec;

/// 单个 tick 产生的帧
///
/// 每个 tick 恰好 3 帧（制动、油门、转向），栈上预留 3 个位置，不分配堆内存。
pub type TickFrames = SmallVec<[DbwFrame; 3]>;

/// 上游执行指令
///
/// 启用 `serde` feature 后的 JSON 形式（`type` 标签）：
///
/// ```json
/// {"type":"throttle","enabled":true,"pedal_percent":40}
/// {"type":"steering","enabled":true,"angle_degrees":-12.5}
/// ```
///
/// 数值在进入通道状态前才限幅，这里保留原始值。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum DbwCommand {
    Throttle { enabled: bool, pedal_percent: f32 },
    Brake { enabled: bool, pedal_percent: f32 },
    Steering { enabled: bool, angle_degrees: f32 },
}

impl DbwCommand {
    pub fn throttle(enabled: bool, pedal_percent: f32) -> Self {
        DbwCommand::Throttle {
            enabled,
            pedal_percent,
        }
    }

    pub fn brake(enabled: bool, pedal_percent: f32) -> Self {
        DbwCommand::Brake {
            enabled,
            pedal_percent,
        }
    }

    pub fn steering(enabled: bool, angle_degrees: f32) -> Self {
        DbwCommand::Steering {
            enabled,
            angle_degrees,
        }
    }

    /// 目标通道
    pub fn channel(&self) -> Channel {
        match self {
            DbwCommand::Throttle { .. } => Channel::Throttle,
            DbwCommand::Brake { .. } => Channel::Brake,
            DbwCommand::Steering { .. } => Channel::Steering,
        }
    }

    pub fn enabled(&self) -> bool {
        match *self {
            DbwCommand::Throttle { enabled, .. }
            | DbwCommand::Brake { enabled, .. }
            | DbwCommand::Steering { enabled, .. } => enabled,
        }
    }

    /// 原始（未限幅）数值
    pub fn raw_value(&self) -> f32 {
        match *self {
            DbwCommand::Throttle { pedal_percent, .. } | DbwCommand::Brake { pedal_percent, .. } => {
                pedal_percent
            },
            DbwCommand::Steering { angle_degrees, .. } => angle_degrees,
        }
    }
}
