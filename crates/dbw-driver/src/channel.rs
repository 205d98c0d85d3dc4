//! 执行通道状态
//!
//! 三路执行通道（油门、制动、转向）各自持有最新指令与超时计数。
//! 所有通道放在同一个 [`ChannelSet`] 中，由 `DbwContext` 的互斥锁统一保护。

use std::fmt;

/// 执行通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Channel {
    Throttle,
    Brake,
    Steering,
}

impl Channel {
    /// 所有通道（编码顺序以 `encoder` 为准）
    pub const ALL: [Channel; 3] = [Channel::Throttle, Channel::Brake, Channel::Steering];

    /// 用于日志的名称
    pub fn name(self) -> &'static str {
        match self {
            Channel::Throttle => "Throttle",
            Channel::Brake => "Brake",
            Channel::Steering => "Steering",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 通道状态机：初始为 Disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ChannelStatus {
    Enabled,
    Disabled,
}

/// 通道指令（已限幅）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelCommand<T> {
    pub enabled: bool,
    pub value: T,
}

/// 指令超时计数（单位：tick）
///
/// 每个 tick 递增一次（饱和，不回绕），收到新指令时清零。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelTimeout {
    counter: u32,
}

impl ChannelTimeout {
    #[cfg(test)]
    pub(crate) fn with_counter(counter: u32) -> Self {
        Self { counter }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// 递增一次，返回递增前的值
    pub fn tick(&mut self) -> u32 {
        let before = self.counter;
        self.counter = before.saturating_add(1);
        before
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

/// 单个通道的完整状态
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelState<T> {
    pub command: ChannelCommand<T>,
    pub timeout: ChannelTimeout,
}

impl<T: Copy> ChannelState<T> {
    /// 写入新指令并清零超时计数
    pub fn set(&mut self, enabled: bool, value: T) {
        self.command = ChannelCommand { enabled, value };
        self.timeout.reset();
    }

    pub fn status(&self) -> ChannelStatus {
        if self.command.enabled {
            ChannelStatus::Enabled
        } else {
            ChannelStatus::Disabled
        }
    }

    /// 本 tick 应当发送的值：禁用时为安全默认值
    pub fn output(&self, safe_default: T) -> T {
        if self.command.enabled {
            self.command.value
        } else {
            safe_default
        }
    }
}

/// 三路通道状态集合
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelSet {
    pub throttle: ChannelState<u8>,
    pub brake: ChannelState<u8>,
    pub steering: ChannelState<f32>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Throttle => self.throttle.command.enabled,
            Channel::Brake => self.brake.command.enabled,
            Channel::Steering => self.steering.command.enabled,
        }
    }

    pub fn timeout_mut(&mut self, channel: Channel) -> &mut ChannelTimeout {
        match channel {
            Channel::Throttle => &mut self.throttle.timeout,
            Channel::Brake => &mut self.brake.timeout,
            Channel::Steering => &mut self.steering.timeout,
        }
    }

    /// 强制禁用（保留最后的指令值）
    pub fn disable(&mut self, channel: Channel) {
        match channel {
            Channel::Throttle => self.throttle.command.enabled = false,
            Channel::Brake => self.brake.command.enabled = false,
            Channel::Steering => self.steering.command.enabled = false,
        }
    }

    pub fn snapshot(&self, channel: Channel) -> ChannelSnapshot {
        let (status, value, timeout_ticks) = match channel {
            Channel::Throttle => (
                self.throttle.status(),
                f32::from(self.throttle.command.value),
                self.throttle.timeout.counter(),
            ),
            Channel::Brake => (
                self.brake.status(),
                f32::from(self.brake.command.value),
                self.brake.timeout.counter(),
            ),
            Channel::Steering => (
                self.steering.status(),
                self.steering.command.value,
                self.steering.timeout.counter(),
            ),
        };
        ChannelSnapshot {
            channel,
            status,
            value,
            timeout_ticks,
        }
    }
}

/// 通道状态的只读快照
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ChannelSnapshot {
    pub channel: Channel,
    pub status: ChannelStatus,
    /// 最后一次（已限幅）指令值：踏板为百分比，转向为角度
    pub value: f32,
    /// 自最后一次指令以来的 tick 数
    pub timeout_ticks: u32,
}

impl ChannelSnapshot {
    pub fn is_enabled(&self) -> bool {
        self.status == ChannelStatus::Enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_disabled() {
        let set = ChannelSet::new();
        for channel in Channel::ALL {
            let snap = set.snapshot(channel);
            assert_eq!(snap.status, ChannelStatus::Disabled);
            assert_eq!(snap.timeout_ticks, 0);
            assert_eq!(snap.value, 0.0);
        }
    }

    #[test]
    fn test_timeout_saturates() {
        let mut timeout = ChannelTimeout {
            counter: u32::MAX - 1,
        };
        assert_eq!(timeout.tick(), u32::MAX - 1);
        assert_eq!(timeout.tick(), u32::MAX);
        assert_eq!(timeout.counter(), u32::MAX);
        timeout.reset();
        assert_eq!(timeout.counter(), 0);
    }

    #[test]
    fn test_set_resets_timeout() {
        let mut state = ChannelState::<u8>::default();
        state.timeout.tick();
        state.timeout.tick();
        state.set(true, 40);
        assert_eq!(state.timeout.counter(), 0);
        assert_eq!(state.status(), ChannelStatus::Enabled);
        assert_eq!(state.output(0), 40);
    }

    #[test]
    fn test_disabled_outputs_safe_default() {
        let mut set = ChannelSet::new();
        set.steering.set(true, 12.5);
        set.disable(Channel::Steering);
        assert_eq!(set.steering.output(0.0), 0.0);
        // 指令值保留，便于诊断
        assert_eq!(set.snapshot(Channel::Steering).value, 12.5);
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::Brake.to_string(), "Brake");
        assert_eq!(Channel::Throttle.name(), "Throttle");
        assert_eq!(Channel::Steering.name(), "Steering");
    }
}
