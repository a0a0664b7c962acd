use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use crate::models::errors::MonitorError;

/// 直播间号
///
/// 正整数,监控会话的唯一键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RoomId(NonZeroU64);

impl RoomId {
    /// 从整数构造,0 返回 None
    pub fn new(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = MonitorError;

    /// 解析用户输入的房间号 (允许首尾空白)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<u64>()
            .ok()
            .and_then(RoomId::new)
            .ok_or_else(|| MonitorError::InvalidRoomId(trimmed.to_string()))
    }
}

impl TryFrom<u64> for RoomId {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        RoomId::new(value).ok_or_else(|| "房间号必须是正整数".to_string())
    }
}

impl From<RoomId> for u64 {
    fn from(id: RoomId) -> Self {
        id.get()
    }
}

/// 直播间基本信息
///
/// 仅用于展示,不参与是否建立连接的判断。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomMetadata {
    pub title: String,
    pub anchor_name: String,
    /// 1 表示开播中
    pub live_status: i32,
    pub cover_url: String,
}

impl RoomMetadata {
    pub fn is_live(&self) -> bool {
        self.live_status == 1
    }

    pub fn live_status_text(&self) -> &'static str {
        if self.is_live() {
            "开播中"
        } else {
            "未开播"
        }
    }
}

/// 直播间播放信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayInfo {
    /// 在线人数
    pub online: u64,
}

/// 开始监控时获取到的房间详情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDetails {
    pub room_id: RoomId,
    pub metadata: RoomMetadata,
    pub play_info: Option<PlayInfo>,
}

/// 当前登录用户的资料
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: u64,
    pub name: String,
    pub avatar_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_room_id() {
        assert_eq!("  21452505 ".parse::<RoomId>().unwrap().get(), 21452505);
        assert!("0".parse::<RoomId>().is_err());
        assert!("-3".parse::<RoomId>().is_err());
        assert!("abc".parse::<RoomId>().is_err());
    }

    #[test]
    fn test_room_id_serde_rejects_zero() {
        assert!(serde_json::from_str::<RoomId>("0").is_err());
        let id: RoomId = serde_json::from_str("42").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
    }

    #[test]
    fn test_live_status_text() {
        let meta = RoomMetadata {
            live_status: 1,
            ..Default::default()
        };
        assert_eq!(meta.live_status_text(), "开播中");
        assert_eq!(RoomMetadata::default().live_status_text(), "未开播");
    }
}
