//! 入站反馈帧路由
//!
//! 1. ID 过滤：只处理 ID 与反馈 ID 集合中任意一项相等的数据帧
//! 2. 按 Byte 0 源标识分发到油门/制动/转向报告
//! 3. 每帧最多投递一份报告

use crate::adapter::DbwContext;
use crate::channel::{Channel, ChannelSet};
use crate::config::Limits;
use crate::metrics::DbwMetrics;
use crate::report::{BrakeReport, FeedbackReport, ReportSink, SteeringReport, ThrottleReport};
use dbw_can::DbwFrame;
use dbw_protocol::{FeedbackFrame, FeedbackIds, ProtocolError, STEERING_UNKNOWN};
use tracing::{debug, error, trace, warn};

/// 路由结果
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// 非反馈帧（ID 不在集合内、错误帧或远程帧）
    Ignored,
    /// 反馈 ID 命中但载荷长度不足
    Malformed(ProtocolError),
    /// 未知源标识
    UnknownSource(u8),
    /// 生成了报告；`exceeds_max` 表示踏板反馈超过配置上限
    Report {
        report: FeedbackReport,
        exceeds_max: bool,
    },
}

impl RouteOutcome {
    pub fn report(&self) -> Option<&FeedbackReport> {
        match self {
            RouteOutcome::Report { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// 对单帧分类并生成报告（纯函数，调用方持有锁）
pub fn classify(
    channels: &ChannelSet,
    limits: &Limits,
    ids: &FeedbackIds,
    frame: &DbwFrame,
    now_us: u64,
) -> RouteOutcome {
    if !frame.is_data_frame() || !ids.contains(frame.id) {
        return RouteOutcome::Ignored;
    }

    let feedback = match FeedbackFrame::try_from(frame) {
        Ok(feedback) => feedback,
        Err(ProtocolError::InvalidValue { value, .. }) => return RouteOutcome::UnknownSource(value),
        Err(e) => return RouteOutcome::Malformed(e),
    };

    match feedback {
        FeedbackFrame::Brake(pedal) => RouteOutcome::Report {
            report: FeedbackReport::Brake(BrakeReport {
                enabled: channels.is_enabled(Channel::Brake),
                pedal_input: pedal.pedal_input,
                override_active: false,
                timestamp_us: now_us,
            }),
            exceeds_max: pedal.pedal_input > limits.brake_max,
        },
        FeedbackFrame::Throttle(pedal) => RouteOutcome::Report {
            report: FeedbackReport::Throttle(ThrottleReport {
                enabled: channels.is_enabled(Channel::Throttle),
                pedal_input: pedal.pedal_input,
                override_active: false,
                timestamp_us: now_us,
            }),
            exceeds_max: pedal.pedal_input > limits.throttle_max,
        },
        FeedbackFrame::Steering => RouteOutcome::Report {
            report: FeedbackReport::Steering(SteeringReport {
                enabled: channels.is_enabled(Channel::Steering),
                steering_wheel_angle: STEERING_UNKNOWN,
                steering_wheel_angle_velocity: STEERING_UNKNOWN,
                steering_wheel_torque: STEERING_UNKNOWN,
                override_active: false,
                timestamp_us: now_us,
            }),
            exceeds_max: false,
        },
    }
}

/// 路由单帧：分类、记录诊断、更新指标
pub fn route_frame(ctx: &DbwContext, frame: &DbwFrame, now_us: u64) -> RouteOutcome {
    let outcome = {
        let channels = ctx.channels();
        classify(
            &channels,
            &ctx.config().limits,
            ctx.feedback_ids(),
            frame,
            now_us,
        )
    };

    let metrics = ctx.metrics();
    match &outcome {
        RouteOutcome::Ignored => {
            trace!("Ignoring frame ID=0x{:X}", frame.id);
            DbwMetrics::incr(&metrics.rx_frames_ignored);
        },
        RouteOutcome::Malformed(e) => {
            debug!("Dropping feedback frame ID=0x{:X}: {}", frame.id, e);
            DbwMetrics::incr(&metrics.rx_frames_ignored);
        },
        RouteOutcome::UnknownSource(source) => {
            error!(
                "Unknown feedback source ID 0x{:02X} in frame ID=0x{:X}",
                source, frame.id
            );
            DbwMetrics::incr(&metrics.unknown_sources);
        },
        RouteOutcome::Report {
            report,
            exceeds_max,
        } => {
            if *exceeds_max {
                match report {
                    FeedbackReport::Throttle(r) => warn!(
                        "Throttle feedback {} exceeds max {}",
                        r.pedal_input,
                        ctx.config().limits.throttle_max
                    ),
                    FeedbackReport::Brake(r) => warn!(
                        "Brake feedback {} exceeds max {}",
                        r.pedal_input,
                        ctx.config().limits.brake_max
                    ),
                    FeedbackReport::Steering(_) => {},
                }
                DbwMetrics::incr(&metrics.feedback_over_max);
            }
        },
    }

    outcome
}

/// 路由单帧并把报告投递给接收端
pub fn dispatch<S>(ctx: &DbwContext, frame: &DbwFrame, now_us: u64, sink: &mut S) -> RouteOutcome
where
    S: ReportSink + ?Sized,
{
    let outcome = route_frame(ctx, frame, now_us);
    if let Some(report) = outcome.report()
        && sink.publish(*report)
    {
        DbwMetrics::incr(&ctx.metrics().reports_published);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbw_protocol::{
        BRAKE_FEEDBACK_SOURCE_ID, DEFAULT_FEEDBACK_CAN_ID, ID_STEERING_POSITION,
        STEERING_FEEDBACK_SOURCE_ID, THROTTLE_FEEDBACK_SOURCE_ID,
    };

    fn classify_default(channels: &ChannelSet, frame: &DbwFrame) -> RouteOutcome {
        classify(
            channels,
            &Limits::default(),
            &FeedbackIds::default(),
            frame,
            77,
        )
    }

    #[test]
    fn test_foreign_id_ignored() {
        let frame = DbwFrame::new_extended(0x1CDB_0000, &[BRAKE_FEEDBACK_SOURCE_ID, 0, 10]);
        assert_eq!(
            classify_default(&ChannelSet::new(), &frame),
            RouteOutcome::Ignored
        );
    }

    #[test]
    fn test_error_and_remote_frames_ignored() {
        let mut frame =
            DbwFrame::new_extended(DEFAULT_FEEDBACK_CAN_ID, &[BRAKE_FEEDBACK_SOURCE_ID, 0, 10]);
        frame.is_error = true;
        assert_eq!(
            classify_default(&ChannelSet::new(), &frame),
            RouteOutcome::Ignored
        );

        frame.is_error = false;
        frame.is_remote = true;
        assert_eq!(
            classify_default(&ChannelSet::new(), &frame),
            RouteOutcome::Ignored
        );
    }

    #[test]
    fn test_brake_feedback_echoes_enable() {
        let mut channels = ChannelSet::new();
        channels.brake.set(true, 20);

        let frame =
            DbwFrame::new_extended(DEFAULT_FEEDBACK_CAN_ID, &[BRAKE_FEEDBACK_SOURCE_ID, 0, 25]);
        match classify_default(&channels, &frame) {
            RouteOutcome::Report {
                report: FeedbackReport::Brake(report),
                exceeds_max,
            } => {
                assert!(report.enabled);
                assert_eq!(report.pedal_input, 25);
                assert!(!report.override_active);
                assert_eq!(report.timestamp_us, 77);
                assert!(!exceeds_max);
            },
            other => panic!("Expected brake report, got {:?}", other),
        }
    }

    #[test]
    fn test_throttle_feedback_over_max_still_reported() {
        let frame = DbwFrame::new_extended(
            DEFAULT_FEEDBACK_CAN_ID,
            &[THROTTLE_FEEDBACK_SOURCE_ID, 0, 255, 0],
        );
        match classify_default(&ChannelSet::new(), &frame) {
            RouteOutcome::Report {
                report: FeedbackReport::Throttle(report),
                exceeds_max,
            } => {
                assert!(!report.enabled);
                assert_eq!(report.pedal_input, 255);
                assert!(exceeds_max);
            },
            other => panic!("Expected throttle report, got {:?}", other),
        }
    }

    #[test]
    fn test_steering_feedback_uses_unknown_sentinel() {
        let mut channels = ChannelSet::new();
        channels.steering.set(true, 3.0);

        let frame = DbwFrame::new_extended(ID_STEERING_POSITION, &[STEERING_FEEDBACK_SOURCE_ID]);
        match classify_default(&channels, &frame) {
            RouteOutcome::Report {
                report: FeedbackReport::Steering(report),
                ..
            } => {
                assert!(report.enabled);
                assert_eq!(report.steering_wheel_angle, STEERING_UNKNOWN);
                assert_eq!(report.steering_wheel_angle_velocity, STEERING_UNKNOWN);
                assert_eq!(report.steering_wheel_torque, STEERING_UNKNOWN);
            },
            other => panic!("Expected steering report, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_source() {
        let frame = DbwFrame::new_extended(DEFAULT_FEEDBACK_CAN_ID, &[0x42, 0, 0]);
        assert_eq!(
            classify_default(&ChannelSet::new(), &frame),
            RouteOutcome::UnknownSource(0x42)
        );
    }

    #[test]
    fn test_short_frames_malformed() {
        let empty = DbwFrame::new_extended(DEFAULT_FEEDBACK_CAN_ID, &[]);
        assert!(matches!(
            classify_default(&ChannelSet::new(), &empty),
            RouteOutcome::Malformed(ProtocolError::InvalidLength { expected: 1, .. })
        ));

        let short = DbwFrame::new_extended(DEFAULT_FEEDBACK_CAN_ID, &[BRAKE_FEEDBACK_SOURCE_ID, 0]);
        assert!(matches!(
            classify_default(&ChannelSet::new(), &short),
            RouteOutcome::Malformed(ProtocolError::InvalidLength { expected: 3, .. })
        ));
    }
}
