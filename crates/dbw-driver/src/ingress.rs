//! 指令入口：限幅并写入通道状态
//!
//! 越界指令是预期内的可恢复情况：限幅到最近的边界并告警，从不丢弃。

use crate::adapter::DbwContext;
use crate::channel::{Channel, ChannelSet};
use crate::command::DbwCommand;
use crate::config::Limits;
use crate::metrics::DbwMetrics;
use tracing::{trace, warn};

/// 指令处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngressOutcome {
    pub channel: Channel,
    /// 数值是否被限幅（或非有限值被替换为安全默认值）
    pub clamped: bool,
}

/// 踏板开度限幅到 `[0, max]` 并四舍五入
///
/// NaN 替换为安全默认值 0。返回 `(存储值, 是否被修改)`。
pub fn clamp_pedal(raw: f32, max: u8) -> (u8, bool) {
    if raw.is_nan() {
        return (0, true);
    }
    let bounded = raw.clamp(0.0, f32::from(max));
    (bounded.round() as u8, bounded != raw)
}

/// 转向角限幅到 `[-max, +max]`
///
/// NaN 替换为回正（0.0）。返回 `(存储值, 是否被修改)`。
pub fn clamp_angle(raw: f32, max: f32) -> (f32, bool) {
    if raw.is_nan() {
        return (0.0, true);
    }
    let bounded = raw.clamp(-max, max);
    (bounded, bounded != raw)
}

/// 将指令写入通道状态（调用方持有锁）
pub fn apply_to(channels: &mut ChannelSet, limits: &Limits, cmd: DbwCommand) -> IngressOutcome {
    let channel = cmd.channel();
    let raw = cmd.raw_value();

    let clamped = match cmd {
        DbwCommand::Throttle {
            enabled,
            pedal_percent,
        } => {
            let (value, clamped) = clamp_pedal(pedal_percent, limits.throttle_max);
            if clamped {
                warn!(
                    "{} command {} outside [0, {}], using {}",
                    channel, raw, limits.throttle_max, value
                );
            }
            channels.throttle.set(enabled, value);
            clamped
        },
        DbwCommand::Brake {
            enabled,
            pedal_percent,
        } => {
            let (value, clamped) = clamp_pedal(pedal_percent, limits.brake_max);
            if clamped {
                warn!(
                    "{} command {} outside [0, {}], using {}",
                    channel, raw, limits.brake_max, value
                );
            }
            channels.brake.set(enabled, value);
            clamped
        },
        DbwCommand::Steering {
            enabled,
            angle_degrees,
        } => {
            let max = limits.steering_angle_max;
            let (value, clamped) = clamp_angle(angle_degrees, max);
            if clamped {
                warn!(
                    "{} command {} outside [{}, {}], using {}",
                    channel, raw, -max, max, value
                );
            }
            channels.steering.set(enabled, value);
            clamped
        },
    };

    trace!("{} command applied: enabled={}", channel, cmd.enabled());
    IngressOutcome { channel, clamped }
}

/// 处理一条上游指令
pub fn apply_command(ctx: &DbwContext, cmd: DbwCommand) -> IngressOutcome {
    let outcome = {
        let mut channels = ctx.channels();
        apply_to(&mut channels, &ctx.config().limits, cmd)
    };
    if outcome.clamped {
        DbwMetrics::incr(&ctx.metrics().commands_clamped);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelStatus;

    #[test]
    fn test_clamp_pedal() {
        assert_eq!(clamp_pedal(40.0, 100), (40, false));
        assert_eq!(clamp_pedal(150.0, 100), (100, true));
        assert_eq!(clamp_pedal(-5.0, 100), (0, true));
        assert_eq!(clamp_pedal(f32::NAN, 100), (0, true));
        assert_eq!(clamp_pedal(f32::INFINITY, 80), (80, true));
        // 四舍五入在限幅之后
        assert_eq!(clamp_pedal(42.6, 100), (43, false));
        assert_eq!(clamp_pedal(99.7, 99), (99, true));
    }

    #[test]
    fn test_clamp_angle() {
        assert_eq!(clamp_angle(12.5, 470.0), (12.5, false));
        assert_eq!(clamp_angle(500.0, 470.0), (470.0, true));
        assert_eq!(clamp_angle(-1000.0, 470.0), (-470.0, true));
        assert_eq!(clamp_angle(f32::NAN, 470.0), (0.0, true));
    }

    #[test]
    fn test_apply_throttle_over_max() {
        let mut channels = ChannelSet::new();
        let outcome = apply_to(
            &mut channels,
            &Limits::default(),
            DbwCommand::throttle(true, 150.0),
        );
        assert!(outcome.clamped);
        assert_eq!(outcome.channel, Channel::Throttle);
        assert_eq!(channels.throttle.command.value, 100);
        assert!(channels.throttle.command.enabled);
    }

    #[test]
    fn test_apply_resets_only_target_timeout() {
        let mut channels = ChannelSet::new();
        for channel in Channel::ALL {
            channels.timeout_mut(channel).tick();
        }

        apply_to(
            &mut channels,
            &Limits::default(),
            DbwCommand::steering(true, -30.0),
        );
        assert_eq!(channels.steering.timeout.counter(), 0);
        assert_eq!(channels.throttle.timeout.counter(), 1);
        assert_eq!(channels.brake.timeout.counter(), 1);
        assert_eq!(channels.steering.command.value, -30.0);
    }

    #[test]
    fn test_apply_disable_keeps_value_in_bounds() {
        let mut channels = ChannelSet::new();
        let limits = Limits {
            brake_max: 60,
            ..Limits::default()
        };
        apply_to(&mut channels, &limits, DbwCommand::brake(true, 50.0));
        apply_to(&mut channels, &limits, DbwCommand::brake(false, 90.0));

        assert_eq!(channels.brake.status(), ChannelStatus::Disabled);
        assert_eq!(channels.brake.command.value, 60);
    }
}
