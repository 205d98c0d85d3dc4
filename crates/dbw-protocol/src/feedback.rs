//! 反馈帧结构体定义
//!
//! 执行器反馈帧的 Byte 0 为源标识（哪一路执行器发出的反馈），
//! 之后的字节含义由源决定：
//!
//! - 油门/制动：Byte 2 为实测踏板开度
//! - 转向：当前固件尚未定义测量字段，仅用于确认转向执行器在线
//!
//! CAN ID 的过滤在驱动层完成（ID 可配置），这里只负责按源解析载荷。

use crate::constants::*;
use crate::{DbwFrame, ProtocolError};

/// 反馈源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FeedbackSource {
    /// 制动执行器
    Brake,
    /// 油门执行器
    Throttle,
    /// 转向执行器
    Steering,
}

impl TryFrom<u8> for FeedbackSource {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            BRAKE_FEEDBACK_SOURCE_ID => Ok(FeedbackSource::Brake),
            THROTTLE_FEEDBACK_SOURCE_ID => Ok(FeedbackSource::Throttle),
            STEERING_FEEDBACK_SOURCE_ID => Ok(FeedbackSource::Steering),
            _ => Err(ProtocolError::InvalidValue {
                field: "FeedbackSource".to_string(),
                value,
            }),
        }
    }
}

/// 踏板反馈（油门 / 制动）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PedalFeedback {
    pub source: FeedbackSource, // Byte 0
    // Byte 1: 保留
    pub pedal_input: u8, // Byte 2: 实测踏板开度（原始值，不限幅）
}

/// 解析后的反馈帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackFrame {
    Throttle(PedalFeedback),
    Brake(PedalFeedback),
    Steering,
}

impl FeedbackFrame {
    /// 反馈源
    pub fn source(&self) -> FeedbackSource {
        match self {
            FeedbackFrame::Throttle(_) => FeedbackSource::Throttle,
            FeedbackFrame::Brake(_) => FeedbackSource::Brake,
            FeedbackFrame::Steering => FeedbackSource::Steering,
        }
    }
}

/// 读取反馈帧的源标识字节
fn source_byte(frame: &DbwFrame) -> Result<u8, ProtocolError> {
    if frame.len < 1 {
        return Err(ProtocolError::InvalidLength {
            expected: 1,
            actual: frame.len as usize,
        });
    }
    Ok(frame.data[0])
}

fn parse_pedal(frame: &DbwFrame, source: FeedbackSource) -> Result<PedalFeedback, ProtocolError> {
    // 验证数据长度（需要 Byte 2）
    if frame.len < 3 {
        return Err(ProtocolError::InvalidLength {
            expected: 3,
            actual: frame.len as usize,
        });
    }

    Ok(PedalFeedback {
        source,
        pedal_input: frame.data[2],
    })
}

impl TryFrom<&DbwFrame> for FeedbackFrame {
    type Error = ProtocolError;

    fn try_from(frame: &DbwFrame) -> Result<Self, Self::Error> {
        let source = FeedbackSource::try_from(source_byte(frame)?)?;

        match source {
            FeedbackSource::Brake => Ok(FeedbackFrame::Brake(parse_pedal(frame, source)?)),
            FeedbackSource::Throttle => Ok(FeedbackFrame::Throttle(parse_pedal(frame, source)?)),
            FeedbackSource::Steering => Ok(FeedbackFrame::Steering),
        }
    }
}

impl TryFrom<DbwFrame> for FeedbackFrame {
    type Error = ProtocolError;

    fn try_from(frame: DbwFrame) -> Result<Self, Self::Error> {
        FeedbackFrame::try_from(&frame)
    }
}
