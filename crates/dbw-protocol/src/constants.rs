//! 协议常量定义
//!
//! 集中定义所有协议相关的常量，避免在代码中散落"魔法数"。

/// 控制帧 Byte 0：本控制器的源标识
pub const CONTROL_SOURCE_ID: u8 = 0xDB;

/// 转向控制帧 Byte 0：固定标记字节
pub const STEERING_MARKER: u8 = 0x01;

/// 反馈帧 Byte 0：制动执行器
pub const BRAKE_FEEDBACK_SOURCE_ID: u8 = 0x18;

/// 反馈帧 Byte 0：油门执行器
pub const THROTTLE_FEEDBACK_SOURCE_ID: u8 = 0x1A;

/// 反馈帧 Byte 0：转向执行器
pub const STEERING_FEEDBACK_SOURCE_ID: u8 = 0x19;

/// 控制帧有效数据长度（油门/制动/转向相同）
pub const CONTROL_FRAME_LEN: u8 = 4;

/// 转向角编码斜率（每度对应的原始值）
///
/// `encoded = round(STEER_MULT * angle + STEER_OFFSET)`
pub const STEER_MULT: f32 = 10.0;

/// 转向角编码偏置（0° 对应的原始值）
pub const STEER_OFFSET: f32 = 32768.0;

/// 默认油门上限（%）
pub const DEFAULT_THROTTLE_MAX: u8 = 100;

/// 默认制动上限（%）
pub const DEFAULT_BRAKE_MAX: u8 = 100;

/// 默认方向盘转角上限（度，对称）
pub const DEFAULT_STEERING_ANGLE_MAX: f32 = 470.0;

/// 转向反馈测量值未知时的占位值
pub const STEERING_UNKNOWN: f32 = 0.0;
