//! SocketCAN CAN 适配器实现
//!
//! 支持 Linux 平台下的 SocketCAN，使用内核级的 CAN 通讯接口。
//!
//! ## 特性
//!
//! - 支持标准帧和扩展帧（线控控制帧均为扩展帧）
//! - 错误帧/远程帧原样上报（`is_error` / `is_remote`），由驱动层过滤
//! - 可选的内核过滤器：只接收反馈帧 ID，降低繁忙总线上的 CPU 占用
//!
//! ## 限制
//!
//! - **仅限 Linux 平台**
//! - **接口配置**：波特率由系统工具（`ip link`）配置，不在应用层设置

use crate::{CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, DbwFrame};
use socketcan::{
    CanFilter, CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Frame, Socket, SocketOptions,
    StandardId,
};
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{trace, warn};

pub mod split;

pub use split::{SocketCanRxAdapter, SocketCanTxAdapter};

/// 默认读超时
///
/// 较短的超时确保 RX 线程能及时检查运行标志。
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// SocketCAN 适配器
///
/// # 示例
///
/// ```no_run
/// use dbw_can::{CanAdapter, DbwFrame, SocketCanAdapter};
///
/// let mut adapter = SocketCanAdapter::new("can0").unwrap();
/// adapter.send(DbwFrame::new_extended(0x18DB0000, &[0xDB, 0, 0, 0])).unwrap();
/// let rx_frame = adapter.receive().unwrap();
/// ```
#[derive(Debug)]
pub struct SocketCanAdapter {
    socket: CanSocket,
    /// 接口名称（如 "can0"）
    interface: String,
    read_timeout: Duration,
}

impl SocketCanAdapter {
    /// 打开 SocketCAN 接口
    ///
    /// # 错误
    /// - `CanError::Device`: 接口不存在或无法打开
    /// - `CanError::Io`: 设置读超时失败
    pub fn new(interface: impl Into<String>) -> Result<Self, CanError> {
        let interface = interface.into();

        let socket = CanSocket::open(&interface).map_err(|e| {
            let kind = match e.kind() {
                io::ErrorKind::NotFound => CanDeviceErrorKind::NotFound,
                io::ErrorKind::PermissionDenied => CanDeviceErrorKind::AccessDenied,
                _ => CanDeviceErrorKind::Backend,
            };
            CanError::Device(CanDeviceError::new(
                kind,
                format!(
                    "Failed to open CAN interface '{}': {}. Is it up?\n  sudo ip link set up {}",
                    interface, e, interface
                ),
            ))
        })?;

        socket.set_read_timeout(DEFAULT_READ_TIMEOUT).map_err(CanError::Io)?;

        trace!("SocketCAN interface '{}' opened", interface);

        Ok(Self {
            socket,
            interface,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// 获取接口名称
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// 获取读超时时间
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// 设置读超时
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), CanError> {
        self.socket.set_read_timeout(timeout).map_err(CanError::Io)?;
        self.read_timeout = timeout;
        Ok(())
    }

    /// 配置内核过滤器，只接收给定的扩展帧 ID
    ///
    /// 分离（split）后的 RX/TX 适配器共享同一个打开文件描述，
    /// 因此过滤器需要在 `split()` 之前设置。
    pub fn set_extended_id_filter(&mut self, ids: &[u32]) -> Result<(), CanError> {
        let filters: Vec<CanFilter> = ids
            .iter()
            .map(|&id| {
                CanFilter::new(
                    id | libc::CAN_EFF_FLAG,
                    libc::CAN_EFF_MASK | libc::CAN_EFF_FLAG,
                )
            })
            .collect();

        self.socket.set_filters(&filters).map_err(|e| {
            CanError::Io(io::Error::other(format!(
                "Failed to set CAN filters on '{}': {}",
                self.interface, e
            )))
        })?;

        trace!(
            "SocketCAN '{}' filters configured: {} IDs",
            self.interface,
            filters.len()
        );
        Ok(())
    }
}

/// 当前系统时间（微秒，Unix 纪元），用作软件时间戳
pub(crate) fn software_timestamp_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// DbwFrame -> socketcan::CanFrame
pub(crate) fn to_can_frame(frame: &DbwFrame) -> Result<CanFrame, CanError> {
    let payload = frame.data_slice();
    let can_frame = if frame.is_extended {
        ExtendedId::new(frame.id).and_then(|id| CanFrame::new(id, payload))
    } else {
        u16::try_from(frame.id)
            .ok()
            .and_then(StandardId::new)
            .and_then(|id| CanFrame::new(id, payload))
    };

    can_frame.ok_or_else(|| {
        CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::InvalidFrame,
            format!("Failed to create frame with ID 0x{:X}", frame.id),
        ))
    })
}

/// socketcan::CanFrame -> DbwFrame
pub(crate) fn from_can_frame(can_frame: &CanFrame, timestamp_us: u64) -> DbwFrame {
    let mut data = [0u8; 8];
    let payload = can_frame.data();
    let len = payload.len().min(8);
    data[..len].copy_from_slice(&payload[..len]);

    DbwFrame {
        id: can_frame.raw_id(),
        data,
        len: len as u8,
        is_extended: can_frame.is_extended(),
        is_error: can_frame.is_error_frame(),
        is_remote: can_frame.is_remote_frame(),
        timestamp_us,
    }
}

/// 接口消失或被关闭（拔出 USB-CAN、`ip link set down`）时内核返回的错误码
fn is_device_gone(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::ENODEV | libc::ENETDOWN | libc::ENXIO)
    )
}

/// SocketCAN 运行期 IO 错误分类
///
/// 接口消失映射为 `Device(NoDevice)`（致命），其余保留为 `Io`（可重试）。
pub fn map_io_error(e: io::Error, op: &str) -> CanError {
    if is_device_gone(&e) {
        return CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::NoDevice,
            format!("SocketCAN {} failed: {}", op, e),
        ));
    }
    CanError::Io(e)
}

/// 读超时在 SocketCAN 上表现为 WouldBlock / TimedOut
pub fn map_read_error(e: io::Error) -> CanError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => CanError::Timeout,
        _ => map_io_error(e, "receive"),
    }
}

pub(crate) fn read_frame(socket: &CanSocket) -> Result<DbwFrame, CanError> {
    let can_frame = socket.read_frame().map_err(map_read_error)?;
    let frame = from_can_frame(&can_frame, software_timestamp_us());
    trace!(
        "Received CAN frame: ID=0x{:X}, len={}, timestamp_us={}",
        frame.id, frame.len, frame.timestamp_us
    );
    Ok(frame)
}

pub(crate) fn write_frame(socket: &CanSocket, frame: &DbwFrame) -> Result<(), CanError> {
    let can_frame = to_can_frame(frame)?;
    socket
        .write_frame(&can_frame)
        .map_err(|e| map_io_error(e, "transmit"))?;
    trace!("Sent CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
    Ok(())
}

impl CanAdapter for SocketCanAdapter {
    fn send(&mut self, frame: DbwFrame) -> Result<(), CanError> {
        write_frame(&self.socket, &frame)
    }

    fn receive(&mut self) -> Result<DbwFrame, CanError> {
        read_frame(&self.socket)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        if let Err(e) = self.set_read_timeout(timeout) {
            warn!("Failed to set receive timeout: {}", e);
        }
    }

    fn receive_timeout(&mut self, timeout: Duration) -> Result<DbwFrame, CanError> {
        let old_timeout = self.read_timeout;
        self.set_read_timeout(timeout)?;
        let result = self.receive();
        let _ = self.set_read_timeout(old_timeout);
        result
    }
}

impl crate::SplittableAdapter for SocketCanAdapter {
    type RxAdapter = SocketCanRxAdapter;
    type TxAdapter = SocketCanTxAdapter;

    /// 分离为独立的 RX 和 TX 适配器
    ///
    /// 两者通过 `dup()` 共享同一个打开文件描述：
    /// 严禁在分离后使用 `set_nonblocking()`，超时只依赖 `SO_RCVTIMEO`。
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        let rx = SocketCanRxAdapter::new(&self.socket, self.read_timeout)?;
        let tx = SocketCanTxAdapter::new(&self.socket)?;

        trace!(
            "SocketCanAdapter split into RX and TX adapters (interface: {})",
            self.interface
        );
        Ok((rx, tx))
    }
}
