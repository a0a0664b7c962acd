//! 礼物答谢

use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::settings::keys;
use crate::models::{ClassifiedEvent, RoomId};
use crate::services::room_connection::RoomConnection;
use crate::services::settings_store::SettingsProvider;

pub const PLACEHOLDER_USERNAME: &str = "【用户名】";
pub const PLACEHOLDER_GIFT: &str = "【礼物】";
pub const PLACEHOLDER_COUNT: &str = "【数量】";

/// 按模板生成答谢文本
///
/// 替换全部三个占位符,模板中未出现的占位符忽略。
pub fn build_message(template: &str, username: &str, gift_name: &str, count: u32) -> String {
    template
        .replace(PLACEHOLDER_USERNAME, username)
        .replace(PLACEHOLDER_GIFT, gift_name)
        .replace(PLACEHOLDER_COUNT, &count.to_string())
}

pub struct ThankResponder {
    connection: Arc<RoomConnection>,
    settings: Arc<dyn SettingsProvider>,
}

impl ThankResponder {
    pub fn new(connection: Arc<RoomConnection>, settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            connection,
            settings,
        }
    }

    /// 收到礼物时按当前设置决定是否答谢
    ///
    /// 非礼物事件或答谢未开启时什么都不做。返回是否发送成功。
    pub async fn handle(&self, room_id: RoomId, event: &ClassifiedEvent) -> bool {
        let ClassifiedEvent::Gift {
            username,
            gift_name,
            count,
        } = event
        else {
            return false;
        };

        if !self.settings.flag(keys::THANK_ENABLED) {
            return false;
        }

        let template = self.settings.monitor_settings().thank_template;
        self.respond(room_id, &template, username, gift_name, *count)
            .await
    }

    /// 发送答谢弹幕,失败只记录日志
    pub async fn respond(
        &self,
        room_id: RoomId,
        template: &str,
        username: &str,
        gift_name: &str,
        count: u32,
    ) -> bool {
        let message = build_message(template, username, gift_name, count);
        match self.connection.send_text(room_id, &message).await {
            Ok(()) => {
                debug!(room_id = %room_id, username, gift_name, "已答谢礼物");
                true
            }
            Err(e) => {
                warn!(room_id = %room_id, username, error = %e, "答谢弹幕发送失败");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_THANK_TEMPLATE;

    #[test]
    fn test_build_default_template() {
        assert_eq!(
            build_message(DEFAULT_THANK_TEMPLATE, "Alice", "Rocket", 3),
            "感谢Alice赠送的Rocket×3！"
        );
    }

    #[test]
    fn test_build_repeated_and_missing_placeholders() {
        assert_eq!(
            build_message("【用户名】【用户名】", "A", "G", 1),
            "AA"
        );
        assert_eq!(build_message("谢谢老板", "A", "G", 1), "谢谢老板");
    }
}
