//! 后台线程循环
//!
//! - `tick_loop`：按固定周期执行 tick，把 3 个控制帧写入总线
//! - `rx_loop`：消费入站帧，路由为反馈报告
//!
//! 两个线程通过共享的 `is_running` 标志联动：任一线程遇到致命 CAN 错误都会清除该标志，
//! 另一线程随后退出。

use crate::adapter::DbwAdapter;
use crate::clock::monotonic_micros;
use crate::metrics::DbwMetrics;
use crate::report::ReportSink;
use dbw_can::{CanError, RxAdapter, TxAdapter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

/// 等待下一个 tick 时检查运行标志的最大间隔
const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// 非致命接收错误后的退避时间
const RX_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// 睡眠到 `deadline`，期间定期检查运行标志
///
/// 返回 `false` 表示等待期间收到了停止信号。
fn sleep_until(deadline: Instant, is_running: &AtomicBool) -> bool {
    loop {
        if !is_running.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        // spin_sleep 提供亚毫秒精度，避免 tick 周期抖动
        spin_sleep::sleep((deadline - now).min(SHUTDOWN_POLL));
    }
}

/// TX 线程主循环
///
/// 按截止时间（而非固定睡眠）调度，避免发送耗时累积成周期漂移。
/// 非致命发送错误只计数和告警，下一个 tick 照常发送。
///
/// # 参数
/// - `tx`: TX 适配器（只写）
/// - `adapter`: 线控适配器
/// - `is_running`: 运行标志（用于生命周期联动）
pub fn tick_loop(mut tx: impl TxAdapter, adapter: DbwAdapter, is_running: Arc<AtomicBool>) {
    let period = adapter.config().tick_period();
    let ctx = adapter.context().clone();
    let metrics = ctx.metrics();
    let mut deadline = Instant::now();

    'ticks: loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("TX thread: is_running flag is false, exiting");
            break;
        }

        let frames = adapter.on_tick(monotonic_micros());
        for frame in frames {
            match tx.send(frame) {
                Ok(()) => DbwMetrics::incr(&metrics.tx_frames_total),
                Err(e) => {
                    DbwMetrics::incr(&metrics.tx_errors);
                    if e.is_fatal() {
                        error!("TX thread: Fatal error detected, setting is_running = false: {}", e);
                        is_running.store(false, Ordering::Release);
                        break 'ticks;
                    }
                    warn!("TX thread: Failed to send frame ID=0x{:X}: {}", frame.id, e);
                },
            }
        }

        deadline += period;
        let now = Instant::now();
        if deadline < now {
            debug!("TX thread: tick overran by {:?}", now - deadline);
            deadline = now;
        }
        if !sleep_until(deadline, &is_running) {
            break;
        }
    }

    trace!("TX thread: loop exited");
}

/// RX 线程主循环
///
/// # 参数
/// - `rx`: RX 适配器（只读，接收超时决定停止信号的响应延迟）
/// - `adapter`: 线控适配器
/// - `sink`: 报告接收端
/// - `is_running`: 运行标志（用于生命周期联动）
pub fn rx_loop<S>(mut rx: impl RxAdapter, adapter: DbwAdapter, mut sink: S, is_running: Arc<AtomicBool>)
where
    S: ReportSink,
{
    let ctx = adapter.context().clone();
    let metrics = ctx.metrics();

    for result in rx.incoming() {
        if !is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        match result {
            Ok(frame) => {
                DbwMetrics::incr(&metrics.rx_frames_total);
                adapter.on_frame(&frame, monotonic_micros(), &mut sink);
            },
            Err(CanError::Timeout) => {
                DbwMetrics::incr(&metrics.rx_timeouts);
            },
            Err(e) => {
                error!("RX thread: CAN receive error: {}", e);
                if e.is_fatal() {
                    error!("RX thread: Fatal error detected, setting is_running = false");
                    is_running.store(false, Ordering::Release);
                    break;
                }
                std::thread::sleep(RX_ERROR_BACKOFF);
            },
        }
    }

    trace!("RX thread: loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbwConfig;
    use crate::report::FeedbackReport;
    use dbw_can::mock::MockBus;
    use dbw_can::{CanDeviceError, CanDeviceErrorKind, DbwFrame, SplittableAdapter};
    use dbw_protocol::{BRAKE_FEEDBACK_SOURCE_ID, DEFAULT_FEEDBACK_CAN_ID};
    use std::thread;

    fn fast_adapter() -> DbwAdapter {
        DbwAdapter::new(DbwConfig {
            tick_period_ms: 5,
            ..DbwConfig::default()
        })
        .unwrap()
    }

    struct FatalTx;

    impl TxAdapter for FatalTx {
        fn send(&mut self, _frame: DbwFrame) -> Result<(), CanError> {
            Err(CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::NoDevice,
                "unplugged",
            )))
        }
    }

    #[test]
    fn test_sleep_until_stops_early() {
        let is_running = AtomicBool::new(false);
        let deadline = Instant::now() + Duration::from_secs(10);
        assert!(!sleep_until(deadline, &is_running));
    }

    #[test]
    fn test_tick_loop_fatal_error_stops() {
        let adapter = fast_adapter();
        let is_running = Arc::new(AtomicBool::new(true));

        tick_loop(FatalTx, adapter.clone(), is_running.clone());

        assert!(!is_running.load(Ordering::Acquire));
        assert_eq!(adapter.metrics().tx_errors, 1);
        assert_eq!(adapter.metrics().ticks, 1);
    }

    #[test]
    fn test_tick_loop_sends_three_frames_per_tick() {
        let bus = MockBus::new();
        let (_rx, tx) = bus.adapter().split().unwrap();
        let adapter = fast_adapter();
        let is_running = Arc::new(AtomicBool::new(true));

        let handle = {
            let adapter = adapter.clone();
            let is_running = is_running.clone();
            thread::spawn(move || tick_loop(tx, adapter, is_running))
        };
        thread::sleep(Duration::from_millis(40));
        is_running.store(false, Ordering::Release);
        handle.join().unwrap();

        let ticks = adapter.metrics().ticks;
        assert!(ticks >= 2);
        assert_eq!(bus.sent_frame_count() as u64, ticks * 3);
    }

    #[test]
    fn test_rx_loop_routes_frames() {
        let bus = MockBus::new();
        let (rx, _tx) = bus.adapter().split().unwrap();
        // 报告帧放在最后：收到报告时前面的帧已全部处理
        bus.queue_frames([
            DbwFrame::new_extended(0x7FF, &[1, 2, 3]),
            DbwFrame::new_extended(DEFAULT_FEEDBACK_CAN_ID, &[BRAKE_FEEDBACK_SOURCE_ID, 0, 30]),
        ]);

        let adapter = fast_adapter();
        let is_running = Arc::new(AtomicBool::new(true));
        let (report_tx, report_rx) = crossbeam_channel::unbounded::<FeedbackReport>();

        let handle = {
            let adapter = adapter.clone();
            let is_running = is_running.clone();
            thread::spawn(move || rx_loop(rx, adapter, report_tx, is_running))
        };

        let report = report_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("brake report");
        assert!(matches!(report, FeedbackReport::Brake(r) if r.pedal_input == 30));

        is_running.store(false, Ordering::Release);
        handle.join().unwrap();

        let metrics = adapter.metrics();
        assert_eq!(metrics.rx_frames_total, 2);
        assert_eq!(metrics.rx_frames_ignored, 1);
        assert_eq!(metrics.reports_published, 1);
    }

    #[cfg(target_os = "linux")]
    mod interface_errors {
        use super::*;
        use std::sync::atomic::AtomicUsize;

        /// 始终返回给定 IO 错误的接收端，记录调用次数
        struct FailingRx {
            errno: i32,
            calls: Arc<AtomicUsize>,
        }

        impl RxAdapter for FailingRx {
            fn receive(&mut self) -> Result<DbwFrame, CanError> {
                self.calls.fetch_add(1, Ordering::Relaxed);
                Err(dbw_can::socketcan::map_read_error(
                    std::io::Error::from_raw_os_error(self.errno),
                ))
            }
        }

        #[test]
        fn test_rx_loop_stops_when_interface_goes_down() {
            let calls = Arc::new(AtomicUsize::new(0));
            let rx = FailingRx {
                errno: libc::ENETDOWN,
                calls: calls.clone(),
            };
            let is_running = Arc::new(AtomicBool::new(true));
            let (report_tx, _report_rx) = crossbeam_channel::unbounded::<FeedbackReport>();

            // 在当前线程运行：循环必须自行退出
            rx_loop(rx, fast_adapter(), report_tx, is_running.clone());

            assert!(!is_running.load(Ordering::Acquire));
            assert_eq!(calls.load(Ordering::Relaxed), 1);
        }

        #[test]
        fn test_rx_loop_backs_off_on_transient_errors() {
            let calls = Arc::new(AtomicUsize::new(0));
            let rx = FailingRx {
                errno: libc::EIO,
                calls: calls.clone(),
            };
            let is_running = Arc::new(AtomicBool::new(true));
            let (report_tx, _report_rx) = crossbeam_channel::unbounded::<FeedbackReport>();

            let handle = {
                let is_running = is_running.clone();
                thread::spawn(move || rx_loop(rx, fast_adapter(), report_tx, is_running))
            };
            thread::sleep(Duration::from_millis(100));
            assert!(is_running.load(Ordering::Acquire));
            is_running.store(false, Ordering::Release);
            handle.join().unwrap();

            // 10ms 退避：100ms 内远少于 100 次调用
            assert!(calls.load(Ordering::Relaxed) < 100);
        }
    }
}
