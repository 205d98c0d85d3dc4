//! 驱动层错误类型定义

use crate::config::ConfigError;
use dbw_can::CanError;
use dbw_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
///
/// 数据驱动的异常（越界指令、未知反馈源、超时）不经过这里：
/// 它们在核心内部被限幅/丢弃/禁用并记录日志。
/// 只有生命周期与传输层故障才以 `DriverError` 返回。
#[derive(Error, Debug)]
pub enum DriverError {
    /// CAN 驱动错误
    #[error("CAN driver error: {0}")]
    Can(#[from] CanError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),

    /// IO 线程已停止（致命错误或已关闭）
    #[error("Driver is not running")]
    NotRunning,
}
