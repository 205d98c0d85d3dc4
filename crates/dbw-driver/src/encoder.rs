//! 出站帧编码
//!
//! 每个 tick 为每路通道恰好生成一帧，不论是否收到新指令。
//! 发送顺序：制动、油门、转向。禁用的通道发送安全默认值（踏板 0，转向回正）。

use crate::channel::ChannelSet;
use crate::command::TickFrames;
use crate::config::CanIds;
use dbw_protocol::{PedalCommandFrame, SteeringCommandFrame};

/// 踏板安全默认值
pub const PEDAL_SAFE_DEFAULT: u8 = 0;

/// 转向安全默认值（回正）
pub const STEERING_SAFE_DEFAULT: f32 = 0.0;

/// 将通道状态编码为本 tick 的出站帧（调用方持有锁）
pub fn encode_channels(channels: &ChannelSet, ids: &CanIds, now_us: u64) -> TickFrames {
    let brake = channels.brake.output(PEDAL_SAFE_DEFAULT);
    let throttle = channels.throttle.output(PEDAL_SAFE_DEFAULT);
    let steering = channels.steering.output(STEERING_SAFE_DEFAULT);

    let mut frames = TickFrames::new();
    frames.push(
        PedalCommandFrame::new(ids.brake, brake)
            .to_frame()
            .with_timestamp(now_us),
    );
    frames.push(
        PedalCommandFrame::new(ids.throttle, throttle)
            .to_frame()
            .with_timestamp(now_us),
    );
    frames.push(
        SteeringCommandFrame::new(ids.steering, steering)
            .to_frame()
            .with_timestamp(now_us),
    );
    frames
}
