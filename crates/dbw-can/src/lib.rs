//! # DBW CAN Adapter Layer
//!
//! CAN 硬件抽象层，提供统一的 CAN 接口抽象。
//!
//! - Linux: `SocketCanAdapter`（基于 `socketcan` crate）
//! - 测试: `mock::MockCanAdapter`（`mock` feature）

use std::time::Duration;
use thiserror::Error;

// 重新导出 dbw-protocol 中的 DbwFrame
pub use dbw_protocol::DbwFrame;

#[cfg(target_os = "linux")]
pub mod socketcan;

#[cfg(target_os = "linux")]
pub use socketcan::{SocketCanAdapter, SocketCanRxAdapter, SocketCanTxAdapter};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// CAN 适配层统一错误类型
#[derive(Error, Debug)]
pub enum CanError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] CanDeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Buffer overflow")]
    BufferOverflow,
    #[error("Bus off")]
    BusOff,
}

impl CanError {
    /// 是否为致命错误（IO 线程应停止）
    ///
    /// 设备错误（断开、权限、无效帧、后端故障）和缓冲区溢出是致命的；
    /// 超时、总线关闭和一般 IO 错误由调用方重试。
    pub fn is_fatal(&self) -> bool {
        matches!(self, CanError::Device(_) | CanError::BufferOverflow)
    }
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanDeviceErrorKind {
    NotFound,
    NoDevice,
    AccessDenied,
    InvalidFrame,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct CanDeviceError {
    pub kind: CanDeviceErrorKind,
    pub message: String,
}

impl CanDeviceError {
    pub fn new(kind: CanDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub trait CanAdapter {
    fn send(&mut self, frame: DbwFrame) -> Result<(), CanError>;
    fn receive(&mut self) -> Result<DbwFrame, CanError>;
    fn set_receive_timeout(&mut self, _timeout: Duration) {}
    fn receive_timeout(&mut self, timeout: Duration) -> Result<DbwFrame, CanError> {
        self.set_receive_timeout(timeout);
        self.receive()
    }
    fn try_receive(&mut self) -> Result<Option<DbwFrame>, CanError> {
        match self.receive_timeout(Duration::ZERO) {
            Ok(frame) => Ok(Some(frame)),
            Err(CanError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

pub trait RxAdapter {
    fn receive(&mut self) -> Result<DbwFrame, CanError>;

    /// 入站帧的惰性序列
    ///
    /// 每次 `next()` 调用一次 `receive()`，因此迭代器永不结束：
    /// 超时以 `Err(CanError::Timeout)` 形式产出，由调用方决定是否继续。
    fn incoming(&mut self) -> Incoming<'_, Self>
    where
        Self: Sized,
    {
        Incoming { rx: self }
    }
}

pub trait TxAdapter {
    fn send(&mut self, frame: DbwFrame) -> Result<(), CanError>;
}

pub trait SplittableAdapter: CanAdapter {
    type RxAdapter: RxAdapter;
    type TxAdapter: TxAdapter;
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError>;
}

/// `RxAdapter::incoming()` 返回的迭代器
pub struct Incoming<'a, R: RxAdapter> {
    rx: &'a mut R,
}

impl<R: RxAdapter> Iterator for Incoming<'_, R> {
    type Item = Result<DbwFrame, CanError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.rx.receive())
    }
}
