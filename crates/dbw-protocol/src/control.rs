//! 控制帧结构体定义
//!
//! 包含油门、制动、转向三路执行器的控制指令帧，
//! 以及转换为 `DbwFrame` 的方法。
//!
//! 所有控制帧均为扩展帧，有效长度 4 字节：
//!
//! | 帧 | Byte 0 | Byte 1 | Byte 2 | Byte 3 |
//! |---|---|---|---|---|
//! | 油门/制动 | `CONTROL_SOURCE_ID` | 0 | 0 | 踏板开度 |
//! | 转向 | `STEERING_MARKER` | 0 | 编码值高字节 | 编码值低字节 |

use crate::constants::*;
use crate::{DbwFrame, u16_to_bytes_be};

/// 踏板控制指令（油门 / 制动共用）
///
/// 油门与制动帧格式完全一致，仅 CAN ID 不同。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PedalCommandFrame {
    pub can_id: u32,
    pub pedal: u8, // Byte 3: 踏板开度（已限幅）
}

impl PedalCommandFrame {
    pub fn new(can_id: u32, pedal: u8) -> Self {
        Self { can_id, pedal }
    }

    /// 转换为 CAN 帧
    pub fn to_frame(self) -> DbwFrame {
        let data = [CONTROL_SOURCE_ID, 0, 0, self.pedal];
        // Byte 1-2: 保留
        DbwFrame::new_extended(self.can_id, &data)
    }
}

/// 转向控制指令
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringCommandFrame {
    pub can_id: u32,
    pub angle_degrees: f32,
}

impl SteeringCommandFrame {
    pub fn new(can_id: u32, angle_degrees: f32) -> Self {
        Self {
            can_id,
            angle_degrees,
        }
    }

    /// 编码后的原始转向值
    pub fn encoded(&self) -> u16 {
        encode_steering_angle(self.angle_degrees)
    }

    /// 转换为 CAN 帧
    pub fn to_frame(self) -> DbwFrame {
        let [hi, lo] = u16_to_bytes_be(self.encoded());
        let data = [STEERING_MARKER, 0, hi, lo];
        DbwFrame::new_extended(self.can_id, &data)
    }
}

/// 方向盘转角（度）→ 16 位原始值
///
/// 仿射映射后四舍五入，超出 `u16` 范围时饱和（NaN 编码为 0）。
pub fn encode_steering_angle(angle_degrees: f32) -> u16 {
    (STEER_MULT * angle_degrees + STEER_OFFSET).round() as u16
}
