//! CAN ID 常量定义和分类
//!
//! 控制帧与聚合反馈帧的 ID 可以通过配置覆盖，这里给出默认值；
//! 转向位置/速度/扭矩反馈帧的 ID 为固定值。

/// 扩展帧（29-bit）ID 的最大值
pub const EXTENDED_ID_MAX: u32 = 0x1FFF_FFFF;

// ============================================================================
// 控制帧 ID 默认值
// ============================================================================

/// 油门控制指令
pub const DEFAULT_THROTTLE_CAN_ID: u32 = 0x1ADB_0000;

/// 制动控制指令
pub const DEFAULT_BRAKE_CAN_ID: u32 = 0x18DB_0000;

/// 转向控制指令
pub const DEFAULT_STEERING_CAN_ID: u32 = 0x19DB_0000;

// ============================================================================
// 反馈帧 ID
// ============================================================================

/// 油门/制动聚合反馈（默认值）
pub const DEFAULT_FEEDBACK_CAN_ID: u32 = 0x1CDB_FFFF;

/// 转向位置反馈
pub const ID_STEERING_POSITION: u32 = 0x1CDB_0019;

/// 转向角速度反馈
pub const ID_STEERING_VELOCITY: u32 = 0x1CDB_0119;

/// 转向扭矩反馈
pub const ID_STEERING_TORQUE: u32 = 0x1CDB_0219;

/// 反馈帧 ID 集合
///
/// 接收侧只处理 ID 与集合中任意一项 **相等** 的帧，
/// 总线上其它设备的帧一律忽略。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackIds {
    ids: [u32; 4],
}

impl FeedbackIds {
    /// 以聚合反馈 ID 构造集合（转向反馈 ID 使用固定值）
    pub fn new(feedback_id: u32) -> Self {
        Self {
            ids: [
                feedback_id,
                ID_STEERING_POSITION,
                ID_STEERING_VELOCITY,
                ID_STEERING_TORQUE,
            ],
        }
    }

    /// 判断 ID 是否为已知反馈帧
    pub fn contains(&self, id: u32) -> bool {
        self.ids.contains(&id)
    }

    /// 集合中的所有 ID（用于配置硬件过滤器）
    pub fn as_slice(&self) -> &[u32] {
        &self.ids
    }
}

impl Default for FeedbackIds {
    fn default() -> Self {
        Self::new(DEFAULT_FEEDBACK_CAN_ID)
    }
}
