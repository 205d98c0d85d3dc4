//! 线控驱动（对外 API）
//!
//! 封装 tick 线程与 RX 线程的生命周期。核心逻辑全部在 [`DbwAdapter`] 中，
//! 这里只负责拆分总线适配器、启动线程、在 Drop 时回收线程。

use crate::adapter::DbwAdapter;
use crate::channel::{Channel, ChannelSnapshot};
use crate::command::DbwCommand;
use crate::config::DbwConfig;
use crate::error::DriverError;
use crate::ingress::IngressOutcome;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{rx_loop, tick_loop};
use crate::report::ReportSink;
use dbw_can::SplittableAdapter;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};

/// 线程回收的最长等待时间
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // 由辅助线程执行阻塞的 join，主线程带超时等待结果
        thread::spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 线控驱动
///
/// # 示例
///
/// ```
/// use dbw_can::mock::MockBus;
/// use dbw_driver::{DbwCommand, DbwConfig, DbwDriver, FeedbackReport};
///
/// let bus = MockBus::new();
/// let (report_tx, _report_rx) = crossbeam_channel::bounded::<FeedbackReport>(64);
/// let driver = DbwDriver::new(bus.adapter(), DbwConfig::default(), report_tx).unwrap();
///
/// driver.send_command(DbwCommand::brake(true, 30.0)).unwrap();
/// ```
pub struct DbwDriver {
    adapter: DbwAdapter,
    is_running: Arc<AtomicBool>,
    tick_thread: Option<JoinHandle<()>>,
    rx_thread: Option<JoinHandle<()>>,
}

impl DbwDriver {
    /// 拆分总线适配器并启动 tick / RX 线程
    pub fn new<C, S>(can: C, config: DbwConfig, sink: S) -> Result<Self, DriverError>
    where
        C: SplittableAdapter,
        C::RxAdapter: Send + 'static,
        C::TxAdapter: Send + 'static,
        S: ReportSink + Send + 'static,
    {
        let adapter = DbwAdapter::new(config)?;
        let (rx, tx) = can.split()?;
        let is_running = Arc::new(AtomicBool::new(true));

        let rx_thread = {
            let adapter = adapter.clone();
            let is_running = is_running.clone();
            thread::Builder::new()
                .name("dbw-rx".to_string())
                .spawn(move || rx_loop(rx, adapter, sink, is_running))
                .map_err(|e| DriverError::IoThread(format!("failed to spawn RX thread: {}", e)))?
        };

        let tick_thread = {
            let adapter = adapter.clone();
            let is_running_tick = is_running.clone();
            thread::Builder::new()
                .name("dbw-tick".to_string())
                .spawn(move || tick_loop(tx, adapter, is_running_tick))
        };
        let tick_thread = match tick_thread {
            Ok(handle) => handle,
            Err(e) => {
                is_running.store(false, Ordering::Release);
                if rx_thread.join_timeout(JOIN_TIMEOUT).is_err() {
                    error!("RX thread failed to shut down within {:?}", JOIN_TIMEOUT);
                }
                return Err(DriverError::IoThread(format!(
                    "failed to spawn tick thread: {}",
                    e
                )));
            },
        };

        let config = adapter.config();
        info!(
            "DBW driver started: tick period {:?}, timeout {} ticks",
            config.tick_period(),
            config.timeout_ticks
        );

        Ok(Self {
            adapter,
            is_running,
            tick_thread: Some(tick_thread),
            rx_thread: Some(rx_thread),
        })
    }

    /// 提交一条上游指令
    ///
    /// 指令直接写入通道状态（持锁时间极短，不阻塞），下一个 tick 生效。
    pub fn send_command(&self, cmd: DbwCommand) -> Result<IngressOutcome, DriverError> {
        if !self.is_running() {
            return Err(DriverError::NotRunning);
        }
        Ok(self.adapter.on_command(cmd))
    }

    /// 后台线程是否仍在运行（致命 CAN 错误后变为 `false`）
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    pub fn adapter(&self) -> &DbwAdapter {
        &self.adapter
    }

    pub fn channel(&self, channel: Channel) -> ChannelSnapshot {
        self.adapter.channel(channel)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.adapter.metrics()
    }
}

impl Drop for DbwDriver {
    fn drop(&mut self) {
        // Release: 之前的所有写入对看到 false 的线程可见
        self.is_running.store(false, Ordering::Release);

        if let Some(handle) = self.tick_thread.take()
            && handle.join_timeout(JOIN_TIMEOUT).is_err()
        {
            error!(
                "Tick thread panicked or failed to shut down within {:?}",
                JOIN_TIMEOUT
            );
        }

        if let Some(handle) = self.rx_thread.take()
            && handle.join_timeout(JOIN_TIMEOUT).is_err()
        {
            error!(
                "RX thread panicked or failed to shut down within {:?}",
                JOIN_TIMEOUT
            );
        }

        info!("DBW driver stopped");
    }
}
