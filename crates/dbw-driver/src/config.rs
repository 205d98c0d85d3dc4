//! 适配器配置
//!
//! 启动时加载一次（TOML），之后只读。所有字段都有默认值，
//! 配置文件中只需写出需要覆盖的项：
//!
//! ```toml
//! tick_period_ms = 100
//! timeout_ticks = 3
//!
//! [can_ids]
//! throttle = "0x1ADB0000"
//! brake = 0x18DB0000
//!
//! [limits]
//! throttle_max = 100
//! steering_angle_max = 470.0
//! ```

use dbw_protocol::{
    DEFAULT_BRAKE_CAN_ID, DEFAULT_BRAKE_MAX, DEFAULT_FEEDBACK_CAN_ID, DEFAULT_STEERING_ANGLE_MAX,
    DEFAULT_STEERING_CAN_ID, DEFAULT_THROTTLE_CAN_ID, DEFAULT_THROTTLE_MAX, EXTENDED_ID_MAX,
    FeedbackIds, STEER_MULT, STEER_OFFSET,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("CAN ID 0x{id:X} is assigned to more than one channel")]
    DuplicateCanId { id: u32 },
}

/// 适配器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbwConfig {
    /// 发送周期（毫秒）
    pub tick_period_ms: u64,
    /// 指令超时阈值（tick 数）
    pub timeout_ticks: u32,
    /// 总线 ID
    pub can_ids: CanIds,
    /// 指令限幅
    pub limits: Limits,
}

impl Default for DbwConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 100,
            timeout_ticks: 3,
            can_ids: CanIds::default(),
            limits: Limits::default(),
        }
    }
}

/// 总线 ID 配置
///
/// 支持 TOML 整数（含 `0x` 字面量）或十六进制字符串（`"0x1ADB0000"` / `"1ADB0000"`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanIds {
    #[serde(with = "hex_can_id")]
    pub throttle: u32,
    #[serde(with = "hex_can_id")]
    pub brake: u32,
    #[serde(with = "hex_can_id")]
    pub steering: u32,
    /// 油门/制动聚合反馈
    #[serde(with = "hex_can_id")]
    pub feedback: u32,
}

impl Default for CanIds {
    fn default() -> Self {
        Self {
            throttle: DEFAULT_THROTTLE_CAN_ID,
            brake: DEFAULT_BRAKE_CAN_ID,
            steering: DEFAULT_STEERING_CAN_ID,
            feedback: DEFAULT_FEEDBACK_CAN_ID,
        }
    }
}

/// 指令限幅
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// 油门上限（%）
    pub throttle_max: u8,
    /// 制动上限（%）
    pub brake_max: u8,
    /// 方向盘转角上限（度，对称）
    pub steering_angle_max: f32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            throttle_max: DEFAULT_THROTTLE_MAX,
            brake_max: DEFAULT_BRAKE_MAX,
            steering_angle_max: DEFAULT_STEERING_ANGLE_MAX,
        }
    }
}

impl DbwConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: DbwConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载并校验
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tick_period_ms",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.timeout_ticks == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ticks",
                reason: "must be at least 1".to_string(),
            });
        }

        let ids = [
            ("can_ids.throttle", self.can_ids.throttle),
            ("can_ids.brake", self.can_ids.brake),
            ("can_ids.steering", self.can_ids.steering),
            ("can_ids.feedback", self.can_ids.feedback),
        ];
        for (field, id) in ids {
            if id > EXTENDED_ID_MAX {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("0x{:X} exceeds the 29-bit extended ID range", id),
                });
            }
        }
        for (i, (_, a)) in ids.iter().enumerate() {
            if ids[i + 1..].iter().any(|(_, b)| a == b) {
                return Err(ConfigError::DuplicateCanId { id: *a });
            }
        }

        let angle_max = self.limits.steering_angle_max;
        if !angle_max.is_finite() || angle_max <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.steering_angle_max",
                reason: format!("{} is not a positive finite angle", angle_max),
            });
        }
        let span = STEER_MULT * angle_max;
        if STEER_OFFSET - span < 0.0 || STEER_OFFSET + span > u16::MAX as f32 {
            return Err(ConfigError::InvalidValue {
                field: "limits.steering_angle_max",
                reason: format!("±{} degrees does not fit the 16-bit steering encoding", angle_max),
            });
        }

        Ok(())
    }

    /// 发送周期
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// 反馈帧 ID 集合
    pub fn feedback_ids(&self) -> FeedbackIds {
        FeedbackIds::new(self.can_ids.feedback)
    }
}

/// CAN ID 的 serde 编解码：整数或十六进制字符串
mod hex_can_id {
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Str(String),
    }

    pub fn serialize<S: Serializer>(id: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:08X}", id))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        match RawId::deserialize(deserializer)? {
            RawId::Int(value) => u32::try_from(value)
                .map_err(|_| de::Error::custom(format!("CAN ID {} is out of range", value))),
            RawId::Str(text) => super::parse_hex_id(&text).map_err(de::Error::custom),
        }
    }
}

/// 解析十六进制 CAN ID（可带 `0x` 前缀）
pub fn parse_hex_id(text: &str) -> Result<u32, String> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex CAN ID '{}': {}", text, e))
}
