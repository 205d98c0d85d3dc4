//! 并发访问测试
//!
//! 多个线程同时写指令、一个线程连续 tick：
//! 每个出站帧都必须是某条完整指令的值，或是通道的安全默认值。

use dbw_driver::{DbwAdapter, DbwCommand, DbwConfig, TickFrames};
use dbw_protocol::encode_steering_angle;
use std::sync::{Arc, Barrier};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

const THROTTLE_VALUES: [f32; 2] = [20.0, 80.0];
const BRAKE_VALUES: [f32; 2] = [10.0, 90.0];
const STEERING_VALUES: [f32; 2] = [-100.0, 250.0];
const TICKS: usize = 2000;

/// 在停止前交替写入两个界内值
fn spawn_writer(
    adapter: DbwAdapter,
    start: Arc<Barrier>,
    stop: Arc<AtomicBool>,
    make: fn(bool, f32) -> DbwCommand,
    values: [f32; 2],
) -> thread::JoinHandle<u64> {
    thread::spawn(move || {
        start.wait();
        let mut written = 0u64;
        loop {
            let value = values[(written % 2) as usize];
            let outcome = adapter.on_command(make(true, value));
            assert!(!outcome.clamped);
            written += 1;
            if stop.load(Ordering::Relaxed) {
                break;
            }
        }
        written
    })
}

#[test]
fn test_concurrent_commands_and_ticks_never_tear() {
    // 阈值足够大：测试期间不会因超时而禁用
    let adapter = DbwAdapter::new(DbwConfig {
        timeout_ticks: 1_000_000,
        ..DbwConfig::default()
    })
    .unwrap();
    let start = Arc::new(Barrier::new(4));
    let stop = Arc::new(AtomicBool::new(false));

    let writers = vec![
        spawn_writer(
            adapter.clone(),
            start.clone(),
            stop.clone(),
            DbwCommand::throttle,
            THROTTLE_VALUES,
        ),
        spawn_writer(
            adapter.clone(),
            start.clone(),
            stop.clone(),
            DbwCommand::brake,
            BRAKE_VALUES,
        ),
        spawn_writer(
            adapter.clone(),
            start.clone(),
            stop.clone(),
            DbwCommand::steering,
            STEERING_VALUES,
        ),
    ];

    let ticker = {
        let adapter = adapter.clone();
        thread::spawn(move || {
            start.wait();
            (0..TICKS)
                .map(|tick| adapter.on_tick(tick as u64))
                .collect::<Vec<TickFrames>>()
        })
    };

    let ticks = ticker.join().unwrap();
    stop.store(true, Ordering::Relaxed);
    let written: u64 = writers.into_iter().map(|h| h.join().unwrap()).sum();

    let ids = adapter.config().can_ids;
    let steering_words = [
        0x8000,
        encode_steering_angle(STEERING_VALUES[0]),
        encode_steering_angle(STEERING_VALUES[1]),
    ];

    assert_eq!(ticks.len(), TICKS);
    for frames in &ticks {
        assert_eq!(frames.len(), 3);

        assert_eq!(frames[0].id, ids.brake);
        assert!([0, 10, 90].contains(&frames[0].data[3]), "brake {}", frames[0].data[3]);

        assert_eq!(frames[1].id, ids.throttle);
        assert!([0, 20, 80].contains(&frames[1].data[3]), "throttle {}", frames[1].data[3]);

        assert_eq!(frames[2].id, ids.steering);
        let word = u16::from_be_bytes([frames[2].data[2], frames[2].data[3]]);
        assert!(steering_words.contains(&word), "steering 0x{:04X}", word);
    }

    let metrics = adapter.metrics();
    assert_eq!(metrics.ticks, TICKS as u64);
    assert_eq!(metrics.commands_clamped, 0);
    assert_eq!(metrics.watchdog_trips, 0);
    assert!(written >= 3);
}

#[test]
fn test_concurrent_ticks_trip_each_channel_once() {
    let adapter = DbwAdapter::new(DbwConfig {
        timeout_ticks: 3,
        ..DbwConfig::default()
    })
    .unwrap();
    adapter.on_command(DbwCommand::brake(true, 40.0));

    // 4 个线程共 200 个 tick：计数饱和之后不会重复触发
    let tickers: Vec<_> = (0..4)
        .map(|_| {
            let adapter = adapter.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    adapter.on_tick(0);
                }
            })
        })
        .collect();
    for ticker in tickers {
        ticker.join().unwrap();
    }

    let metrics = adapter.metrics();
    assert_eq!(metrics.ticks, 200);
    assert_eq!(metrics.watchdog_trips, 3);
}
