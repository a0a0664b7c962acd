use serde::Serialize;
use std::fmt;

use crate::models::errors::ConnectError;
use crate::models::RoomId;

/// 已分类的直播间事件
///
/// 弹幕与礼物来自弹幕流,广告在发送成功后由引擎内部产生。
/// 构造后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifiedEvent {
    /// 弹幕
    Danmaku {
        username: String,
        user_id: String,
        text: String,
        /// 是否为当前登录用户自己发送
        is_self: bool,
    },

    /// 礼物
    Gift {
        username: String,
        gift_name: String,
        count: u32,
    },

    /// 已发送的定时广告
    Advertisement { text: String },
}

impl ClassifiedEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifiedEvent::Danmaku { .. } => "danmaku",
            ClassifiedEvent::Gift { .. } => "gift",
            ClassifiedEvent::Advertisement { .. } => "advertisement",
        }
    }
}

/// 列表展示用的单行文本
impl fmt::Display for ClassifiedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifiedEvent::Danmaku {
                username,
                text,
                is_self,
                ..
            } => {
                write!(f, "{}: {}", username, text)?;
                if *is_self {
                    write!(f, " [我]")?;
                }
                Ok(())
            }
            ClassifiedEvent::Gift {
                username,
                gift_name,
                count,
            } => write!(f, "{} 赠送了 {} ×{}", username, gift_name, count),
            ClassifiedEvent::Advertisement { text } => write!(f, "[广告] {}", text),
        }
    }
}

/// 弹幕连接状态
///
/// Idle -> Connecting -> Connected -> Disconnecting -> Idle
///             |             |
///             +-------------+---> Failed (终态,直到再次 start)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    Connecting { room_id: RoomId },
    Connected { room_id: RoomId },
    Disconnecting { room_id: RoomId },
    Failed { room_id: RoomId, error: ConnectError },
}

impl ConnectionState {
    /// 当前绑定的房间
    pub fn room_id(&self) -> Option<RoomId> {
        match self {
            ConnectionState::Idle => None,
            ConnectionState::Connecting { room_id }
            | ConnectionState::Connected { room_id }
            | ConnectionState::Disconnecting { room_id }
            | ConnectionState::Failed { room_id, .. } => Some(*room_id),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ConnectionState::Failed { .. })
    }

    /// 状态栏文本
    pub fn status_text(&self) -> String {
        match self {
            ConnectionState::Idle => "未开始监控".to_string(),
            ConnectionState::Connecting { .. } => "正在连接弹幕服务器...".to_string(),
            ConnectionState::Connected { .. } => "弹幕服务器已连接".to_string(),
            ConnectionState::Disconnecting { .. } => "正在断开弹幕连接...".to_string(),
            ConnectionState::Failed { error, .. } => error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lines() {
        let gift = ClassifiedEvent::Gift {
            username: "Alice".to_string(),
            gift_name: "小心心".to_string(),
            count: 3,
        };
        assert_eq!(gift.to_string(), "Alice 赠送了 小心心 ×3");

        let mine = ClassifiedEvent::Danmaku {
            username: "Bob".to_string(),
            user_id: "2".to_string(),
            text: "hi".to_string(),
            is_self: true,
        };
        assert_eq!(mine.to_string(), "Bob: hi [我]");

        let ad = ClassifiedEvent::Advertisement {
            text: "关注主播".to_string(),
        };
        assert_eq!(ad.to_string(), "[广告] 关注主播");
    }

    #[test]
    fn test_connection_state_room() {
        let room = RoomId::new(7).unwrap();
        assert_eq!(ConnectionState::Idle.room_id(), None);
        assert_eq!(ConnectionState::Connected { room_id: room }.room_id(), Some(room));
        let failed = ConnectionState::Failed {
            room_id: room,
            error: ConnectError::StreamClosed("eof".to_string()),
        };
        assert!(failed.is_failed());
        assert!(failed.status_text().contains("eof"));
    }

    #[test]
    fn test_serialize_tag() {
        let ev = ClassifiedEvent::Advertisement { text: "x".to_string() };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "advertisement");
    }
}
