//! 线控驱动层
//!
//! 油门、制动、转向三路执行通道的指令/反馈转换核心：
//! - 指令入口：限幅并写入通道状态（[`ingress`]）
//! - 出站编码：每个 tick 每路通道一帧（[`encoder`]）
//! - 看门狗：指令超时后强制禁用通道（[`watchdog`]）
//! - 入站路由：按 ID 与源标识把反馈帧转换为报告（[`router`]）
//!
//! [`DbwAdapter`] 是不含线程的事件接口（`on_command` / `on_tick` / `on_frame`），
//! [`DbwDriver`] 在其上加入 tick 线程与 RX 线程。

mod builder;
pub mod adapter;
pub mod channel;
pub mod clock;
pub mod command;
pub mod config;
mod driver;
pub mod encoder;
mod error;
pub mod ingress;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod router;
pub mod watchdog;

pub use adapter::{DbwAdapter, DbwContext};
pub use builder::{DEFAULT_INTERFACE, DbwDriverBuilder};
pub use channel::{Channel, ChannelSnapshot, ChannelStatus};
pub use command::{DbwCommand, TickFrames};
pub use config::{CanIds, ConfigError, DbwConfig, Limits};
pub use driver::DbwDriver;
pub use error::DriverError;
pub use ingress::IngressOutcome;
pub use metrics::{DbwMetrics, MetricsSnapshot};
pub use pipeline::{rx_loop, tick_loop};
pub use report::{BrakeReport, FeedbackReport, ReportSink, SteeringReport, ThrottleReport};
pub use router::RouteOutcome;
