//! 指令超时看门狗
//!
//! 每个 tick（编码之后）推进一次所有通道的超时计数。
//! 计数 **恰好** 达到阈值的那个 tick 强制禁用该通道并告警；
//! 之后继续饱和递增但不再产生副作用，直到新指令清零。

use crate::channel::{Channel, ChannelSet};
use smallvec::SmallVec;
use tracing::warn;

/// 本 tick 被看门狗禁用的通道
pub type TrippedChannels = SmallVec<[Channel; 3]>;

/// 推进超时计数（调用方持有锁）
pub fn age(channels: &mut ChannelSet, threshold: u32) -> TrippedChannels {
    let mut tripped = TrippedChannels::new();
    for channel in Channel::ALL {
        let timeout = channels.timeout_mut(channel);
        let before = timeout.tick();
        if before < threshold && timeout.counter() >= threshold {
            channels.disable(channel);
            warn!("{} command timeout, disabling", channel);
            tripped.push(channel);
        }
    }
    tripped
}
