//! # DBW Protocol
//!
//! 线控底盘（Drive-by-Wire）CAN 总线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: CAN ID 常量定义与反馈 ID 分类
//! - `constants`: 协议常量定义（源标识字节、转向编码系数）
//! - `control`: 控制帧构建（油门/制动/转向）
//! - `feedback`: 反馈帧解析
//!
//! ## 字节序
//!
//! 转向指令使用 Motorola (MSB) 高位在前（大端字节序）。

pub mod constants;
pub mod control;
pub mod feedback;
pub mod ids;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use feedback::*;
pub use ids::*;

use thiserror::Error;

/// CAN 2.0 帧的统一抽象
///
/// `DbwFrame` 是协议层和硬件层之间的中间抽象：
/// - 协议层通过 `new_extended()` 构建控制帧，通过 `TryFrom<&DbwFrame>` 解析反馈帧
/// - CAN 层（SocketCAN / Mock）负责与具体驱动帧类型互相转换
///
/// ```text
/// Protocol Layer (dbw-protocol)
///     ↓
/// DbwFrame (此类型)
///     ↓
/// CAN Layer (dbw-can)
///     ↓
/// Hardware
/// ```
///
/// # 设计特性
///
/// - **Copy trait**：零成本复制，每个 tick 产生 3 帧
/// - **固定 8 字节**：避免堆分配
/// - **错误帧/远程帧标记**：接收侧据此过滤非数据帧
///
/// # 示例
///
/// ```rust
/// use dbw_protocol::DbwFrame;
///
/// let frame = DbwFrame::new_extended(0x18DB0000, &[0xDB, 0, 0, 40]);
///
/// assert_eq!(frame.id(), 0x18DB0000);
/// assert!(frame.is_extended);
/// assert_eq!(frame.data_slice(), &[0xDB, 0, 0, 40]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DbwFrame {
    /// CAN ID（标准帧或扩展帧）
    pub id: u32,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; 8],

    /// 有效数据长度 (0-8)
    pub len: u8,

    /// 是否为扩展帧（29-bit ID）
    pub is_extended: bool,

    /// 是否为错误帧
    pub is_error: bool,

    /// 是否为远程请求帧（RTR）
    pub is_remote: bool,

    /// 时间戳（微秒），0 表示不可用
    pub timestamp_us: u64,
}

impl DbwFrame {
    /// 创建标准帧
    pub fn new_standard(id: u16, data: &[u8]) -> Self {
        Self::new(id as u32, data, false)
    }

    /// 创建扩展帧
    pub fn new_extended(id: u32, data: &[u8]) -> Self {
        Self::new(id, data, true)
    }

    fn new(id: u32, data: &[u8], is_extended: bool) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(8);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            data: fixed_data,
            len: len as u8,
            is_extended,
            is_error: false,
            is_remote: false,
            timestamp_us: 0,
        }
    }

    /// 设置时间戳（链式调用）
    pub fn with_timestamp(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = timestamp_us;
        self
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..(self.len as usize).min(8)]
    }

    /// 获取 CAN ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// 获取完整数据（8字节固定数组）
    pub fn data(&self) -> &[u8; 8] {
        &self.data
    }

    /// 是否为普通数据帧（非错误帧、非远程帧）
    pub fn is_data_frame(&self) -> bool {
        !self.is_error && !self.is_remote
    }
}

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid value for field {field}: 0x{value:02X}")]
    InvalidValue { field: String, value: u8 },
}

/// u16 转大端字节序
pub fn u16_to_bytes_be(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_extended_pads_payload() {
        let frame = DbwFrame::new_extended(0x1ADB0000, &[1, 2, 3, 4]);
        assert_eq!(frame.len, 4);
        assert_eq!(frame.data, [1, 2, 3, 4, 0, 0, 0, 0]);
        assert!(frame.is_extended);
        assert!(frame.is_data_frame());
        assert_eq!(frame.timestamp_us, 0);
    }

    #[test]
    fn test_new_truncates_long_payload() {
        let frame = DbwFrame::new_standard(0x123, &[0xAA; 12]);
        assert_eq!(frame.len, 8);
        assert_eq!(frame.data_slice().len(), 8);
        assert!(!frame.is_extended);
    }

    #[test]
    fn test_with_timestamp() {
        let frame = DbwFrame::new_extended(0x1, &[]).with_timestamp(42);
        assert_eq!(frame.timestamp_us, 42);
        assert!(frame.data_slice().is_empty());
    }

    #[test]
    fn test_error_and_remote_frames_are_not_data_frames() {
        let mut frame = DbwFrame::new_extended(0x1, &[0]);
        frame.is_error = true;
        assert!(!frame.is_data_frame());

        let mut frame = DbwFrame::new_extended(0x1, &[0]);
        frame.is_remote = true;
        assert!(!frame.is_data_frame());
    }

    #[test]
    fn test_u16_be_helpers() {
        assert_eq!(u16_to_bytes_be(0x8000), [0x80, 0x00]);
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidLength {
            expected: 3,
            actual: 1,
        };
        assert_eq!(err.to_string(), "Invalid frame length: expected 3, got 1");

        let err = ProtocolError::InvalidValue {
            field: "FeedbackSource".to_string(),
            value: 0x7F,
        };
        assert_eq!(err.to_string(), "Invalid value for field FeedbackSource: 0x7F");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_frame_serde_json() {
        let frame = DbwFrame::new_extended(0x19DB0000, &[1, 0, 0x80, 0]);
        let json = serde_json::to_string(&frame).unwrap();
        let back: DbwFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(frame, back);
    }
}
