use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// 设置项键名
pub mod keys {
    pub const THANK_ENABLED: &str = "thank_enabled";
    pub const THANK_TEMPLATE: &str = "thank_template";
    pub const AD_ENABLED: &str = "ad_enabled";
    pub const AD_LIST: &str = "ad_list";
}

/// 默认答谢模板
pub const DEFAULT_THANK_TEMPLATE: &str = "感谢【用户名】赠送的【礼物】×【数量】！";

/// 广告间隔单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdUnit {
    #[default]
    #[serde(rename = "分钟")]
    Minutes,
    #[serde(rename = "小时")]
    Hours,
}

impl AdUnit {
    pub fn seconds(self) -> u64 {
        match self {
            AdUnit::Minutes => 60,
            AdUnit::Hours => 3600,
        }
    }
}

/// 一条定时广告配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdEntry {
    pub interval: u32,
    #[serde(default)]
    pub unit: AdUnit,
    #[serde(default)]
    pub text: String,
}

impl Default for AdEntry {
    fn default() -> Self {
        Self {
            interval: 5,
            unit: AdUnit::Minutes,
            text: String::new(),
        }
    }
}

impl AdEntry {
    pub fn new(interval: u32, unit: AdUnit, text: impl Into<String>) -> Self {
        Self {
            interval,
            unit,
            text: text.into(),
        }
    }

    /// 发送间隔
    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval) * self.unit.seconds())
    }

    /// 文案非空且间隔为正时才会被调度
    pub fn is_schedulable(&self) -> bool {
        self.interval > 0 && !self.text.trim().is_empty()
    }
}

/// 监控相关设置的类型化视图
///
/// 从设置存储的键值表宽松构建: 缺失的键取默认值,
/// 解析失败的广告条目被跳过。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSettings {
    pub thank_enabled: bool,
    pub thank_template: String,
    pub ad_enabled: bool,
    pub ad_list: Vec<AdEntry>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            thank_enabled: false,
            thank_template: DEFAULT_THANK_TEMPLATE.to_string(),
            ad_enabled: false,
            ad_list: Vec::new(),
        }
    }
}

impl MonitorSettings {
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        Self {
            thank_enabled: bool_value(map.get(keys::THANK_ENABLED)),
            thank_template: map
                .get(keys::THANK_TEMPLATE)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(defaults.thank_template),
            ad_enabled: bool_value(map.get(keys::AD_ENABLED)),
            ad_list: parse_ad_list(map.get(keys::AD_LIST)),
        }
    }
}

/// 非布尔值一律视为 false
pub fn bool_value(value: Option<&Value>) -> bool {
    value.and_then(Value::as_bool).unwrap_or(false)
}

/// 解析广告列表,跳过无法解析的条目
pub fn parse_ad_list(value: Option<&Value>) -> Vec<AdEntry> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match AdEntry::deserialize(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(index, error = %e, "跳过无法解析的广告条目");
                None
            }
        })
        .collect()
}
