//! 单调时钟
//!
//! 报告与出站帧的时间戳统一使用进程内单调时钟（微秒），不受系统时间调整影响。

use std::sync::OnceLock;
use std::time::Instant;

static CLOCK_START: OnceLock<Instant> = OnceLock::new();

/// 自首次调用以来的单调时间（微秒）
pub fn monotonic_micros() -> u64 {
    let start = CLOCK_START.get_or_init(Instant::now);
    start.elapsed().as_micros() as u64
}
