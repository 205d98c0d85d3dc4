//! Builder 模式实现
//!
//! 提供链式构造基于 SocketCAN 的 `DbwDriver` 的便捷方式。

use crate::config::DbwConfig;
use crate::driver::DbwDriver;
use crate::error::DriverError;
use crate::report::ReportSink;
use std::time::Duration;

/// 默认 CAN 接口
pub const DEFAULT_INTERFACE: &str = "can0";

/// DbwDriver Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use dbw_driver::{DbwConfig, DbwDriverBuilder, FeedbackReport};
///
/// let (report_tx, report_rx) = crossbeam_channel::bounded::<FeedbackReport>(64);
/// let driver = DbwDriverBuilder::new()
///     .interface("can1")
///     .config(DbwConfig::default())
///     .build(report_tx)
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DbwDriverBuilder {
    /// SocketCAN 接口名称（如 "can0"、"vcan0"）
    interface: Option<String>,
    config: DbwConfig,
    /// 是否在内核中只接收反馈帧 ID
    hardware_filter: bool,
    /// RX 读超时（决定 RX 线程响应停止信号的延迟）
    receive_timeout: Option<Duration>,
}

impl DbwDriverBuilder {
    pub fn new() -> Self {
        Self {
            interface: None,
            config: DbwConfig::default(),
            hardware_filter: true,
            receive_timeout: None,
        }
    }

    /// 设置 CAN 接口（默认 "can0"）
    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// 设置适配器配置
    pub fn config(mut self, config: DbwConfig) -> Self {
        self.config = config;
        self
    }

    /// 启用/禁用内核 ID 过滤（默认启用）
    ///
    /// 禁用后所有帧都会进入 RX 线程，由软件过滤；调试总线时有用。
    pub fn hardware_filter(mut self, enabled: bool) -> Self {
        self.hardware_filter = enabled;
        self
    }

    /// 设置 RX 读超时
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = Some(timeout);
        self
    }

    pub fn interface_name(&self) -> &str {
        self.interface.as_deref().unwrap_or(DEFAULT_INTERFACE)
    }

    /// 打开总线并启动驱动
    #[cfg(target_os = "linux")]
    pub fn build<S>(self, sink: S) -> Result<DbwDriver, DriverError>
    where
        S: ReportSink + Send + 'static,
    {
        use dbw_can::SocketCanAdapter;
        use tracing::info;

        // 先校验配置，避免无效配置时打开设备
        self.config.validate()?;

        let interface = self.interface_name().to_string();
        let mut can = SocketCanAdapter::new(&interface)?;

        if let Some(timeout) = self.receive_timeout {
            can.set_read_timeout(timeout)?;
        }

        if self.hardware_filter {
            let ids = self.config.feedback_ids();
            can.set_extended_id_filter(ids.as_slice())?;
        }

        info!(
            "Opened SocketCAN interface '{}' (hardware filter: {})",
            interface, self.hardware_filter
        );
        DbwDriver::new(can, self.config, sink)
    }

    /// 打开总线并启动驱动
    ///
    /// SocketCAN 仅在 Linux 上可用；其它平台请使用 `DbwDriver::new` 并自行提供适配器。
    #[cfg(not(target_os = "linux"))]
    pub fn build<S>(self, _sink: S) -> Result<DbwDriver, DriverError>
    where
        S: ReportSink + Send + 'static,
    {
        use dbw_can::{CanDeviceError, CanDeviceErrorKind, CanError};

        self.config.validate()?;
        Err(DriverError::Can(CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::Backend,
            format!(
                "SocketCAN is only available on Linux (interface '{}')",
                self.interface_name()
            ),
        ))))
    }
}

impl Default for DbwDriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}
