//! 内存 Mock CAN 适配器
//!
//! 无硬件依赖，用于驱动层单元测试和集成测试。
//! `MockBus` 是可克隆的句柄：适配器被移动进 IO 线程后，
//! 测试代码仍可通过同一个 `MockBus` 注入入站帧、读取已发送帧。

use crate::{CanAdapter, CanError, DbwFrame, RxAdapter, SplittableAdapter, TxAdapter};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// 空队列时 `receive()` 的默认等待时间
const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(1);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 共享的模拟总线
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    inbound: Arc<Mutex<VecDeque<DbwFrame>>>,
    sent: Arc<Mutex<Vec<DbwFrame>>>,
    failing_sends: Arc<AtomicUsize>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建连接到此总线的适配器
    pub fn adapter(&self) -> MockCanAdapter {
        MockCanAdapter {
            bus: self.clone(),
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }

    /// 队列一个入站帧
    pub fn queue_frame(&self, frame: DbwFrame) {
        lock(&self.inbound).push_back(frame);
    }

    /// 队列多个入站帧
    pub fn queue_frames(&self, frames: impl IntoIterator<Item = DbwFrame>) {
        lock(&self.inbound).extend(frames);
    }

    /// 尚未被接收的入站帧数量
    pub fn pending_inbound(&self) -> usize {
        lock(&self.inbound).len()
    }

    /// 取出所有已发送的帧
    pub fn take_sent_frames(&self) -> Vec<DbwFrame> {
        std::mem::take(&mut *lock(&self.sent))
    }

    /// 已发送帧的数量
    pub fn sent_frame_count(&self) -> usize {
        lock(&self.sent).len()
    }

    /// 让接下来的 `count` 次发送返回 `CanError::BusOff`
    pub fn fail_next_sends(&self, count: usize) {
        self.failing_sends.store(count, Ordering::Release);
    }

    fn receive(&self, timeout: Duration) -> Result<DbwFrame, CanError> {
        if let Some(frame) = lock(&self.inbound).pop_front() {
            return Ok(frame);
        }
        if !timeout.is_zero() {
            std::thread::sleep(timeout);
        }
        Err(CanError::Timeout)
    }

    fn send(&self, frame: DbwFrame) -> Result<(), CanError> {
        let should_fail = self
            .failing_sends
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(CanError::BusOff);
        }
        lock(&self.sent).push(frame);
        Ok(())
    }
}

/// Mock CAN 适配器
#[derive(Debug)]
pub struct MockCanAdapter {
    bus: MockBus,
    receive_timeout: Duration,
}

impl MockCanAdapter {
    /// 创建独立总线上的适配器
    pub fn new() -> Self {
        MockBus::new().adapter()
    }

    /// 获取总线句柄
    pub fn bus(&self) -> MockBus {
        self.bus.clone()
    }
}

impl Default for MockCanAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl CanAdapter for MockCanAdapter {
    fn send(&mut self, frame: DbwFrame) -> Result<(), CanError> {
        self.bus.send(frame)
    }

    fn receive(&mut self) -> Result<DbwFrame, CanError> {
        self.bus.receive(self.receive_timeout)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.receive_timeout = timeout;
    }
}

/// Mock RX 适配器
#[derive(Debug)]
pub struct MockRxAdapter {
    bus: MockBus,
    receive_timeout: Duration,
}

impl RxAdapter for MockRxAdapter {
    fn receive(&mut self) -> Result<DbwFrame, CanError> {
        self.bus.receive(self.receive_timeout)
    }
}

/// Mock TX 适配器
#[derive(Debug)]
pub struct MockTxAdapter {
    bus: MockBus,
}

impl TxAdapter for MockTxAdapter {
    fn send(&mut self, frame: DbwFrame) -> Result<(), CanError> {
        self.bus.send(frame)
    }
}

impl SplittableAdapter for MockCanAdapter {
    type RxAdapter = MockRxAdapter;
    type TxAdapter = MockTxAdapter;

    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        Ok((
            MockRxAdapter {
                bus: self.bus.clone(),
                receive_timeout: self.receive_timeout,
            },
            MockTxAdapter { bus: self.bus },
        ))
    }
}
