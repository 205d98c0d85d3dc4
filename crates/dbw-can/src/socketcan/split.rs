//! SocketCAN 适配器分离实现
//!
//! 提供独立的 RX 和 TX 适配器，支持双线程并发访问。
//! 基于 `CanSocket::try_clone()` 实现，利用 Linux 的 `dup()` 系统调用。
//!
//! # ⚠️ `try_clone()` 的共享状态
//!
//! 复制出的 FD 共享"打开文件描述"：`O_NONBLOCK` 标志和过滤器都是共享的。
//! 超时只使用 `SO_RCVTIMEO`，严禁调用 `set_nonblocking()`。

use super::{read_frame, write_frame};
use crate::{CanError, DbwFrame, RxAdapter, TxAdapter};
use socketcan::{CanSocket, Socket};
use std::os::fd::AsFd;
use std::time::Duration;

/// 只读适配器（用于 RX 线程）
pub struct SocketCanRxAdapter {
    socket: CanSocket,
    read_timeout: Duration,
}

impl SocketCanRxAdapter {
    /// 创建新的 RX 适配器
    ///
    /// # 错误
    /// - `CanError::Io`: 克隆 socket 或设置超时失败
    pub fn new(socket: &CanSocket, read_timeout: Duration) -> Result<Self, CanError> {
        let rx_socket = socket.as_fd().try_clone_to_owned().map(CanSocket::from).map_err(|e| {
            CanError::Io(std::io::Error::other(format!(
                "Failed to clone SocketCAN socket for RX: {}",
                e
            )))
        })?;

        rx_socket.set_read_timeout(read_timeout).map_err(CanError::Io)?;

        Ok(Self {
            socket: rx_socket,
            read_timeout,
        })
    }

    /// 获取读超时时间
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

impl RxAdapter for SocketCanRxAdapter {
    fn receive(&mut self) -> Result<DbwFrame, CanError> {
        read_frame(&self.socket)
    }
}

/// 只写适配器（用于 TX 线程）
pub struct SocketCanTxAdapter {
    socket: CanSocket,
}

impl SocketCanTxAdapter {
    /// 创建新的 TX 适配器
    pub fn new(socket: &CanSocket) -> Result<Self, CanError> {
        let tx_socket = socket.as_fd().try_clone_to_owned().map(CanSocket::from).map_err(|e| {
            CanError::Io(std::io::Error::other(format!(
                "Failed to clone SocketCAN socket for TX: {}",
                e
            )))
        })?;

        Ok(Self { socket: tx_socket })
    }
}

impl TxAdapter for SocketCanTxAdapter {
    fn send(&mut self, frame: DbwFrame) -> Result<(), CanError> {
        write_frame(&self.socket, &frame)
    }
}
