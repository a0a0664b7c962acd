//! 远程直播平台能力
//!
//! 本引擎不实现平台协议,只依赖下列能力:
//! 扫码登录、房间信息、弹幕流订阅、发送弹幕。
//! 具体实现由宿主注入,测试中使用内存实现。

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::models::{
    ChallengeStatus, Credential, LoginChallenge, PlatformError, PlayInfo, RoomId, RoomMetadata,
    UserProfile,
};

/// 弹幕消息事件类型
pub const EVENT_DANMAKU: &str = "DANMU_MSG";

/// 礼物事件类型
pub const EVENT_GIFT: &str = "SEND_GIFT";

/// 弹幕流认证成功 (连接已被服务器确认)
pub const EVENT_VERIFIED: &str = "VERIFICATION_SUCCESSFUL";

/// 弹幕流回调
///
/// 在平台的接收循环中同步调用,不得阻塞。
pub type EventCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// 单个房间的弹幕流订阅
#[async_trait]
pub trait EventStream: Send + Sync {
    /// 注册某类事件的回调,必须在 `connect` 之前调用
    fn register(&mut self, event_type: &str, callback: EventCallback);

    /// 建立连接并运行接收循环,直到流结束才返回
    ///
    /// 正常断开 (调用了 `disconnect`) 返回 `Ok(())`。
    async fn connect(&self) -> Result<(), PlatformError>;

    /// 请求断开,等待接收循环退出
    async fn disconnect(&self) -> Result<(), PlatformError>;
}

/// 直播平台客户端
#[async_trait]
pub trait LivePlatform: Send + Sync {
    /// 生成登录二维码
    async fn generate_login_challenge(&self) -> Result<LoginChallenge, PlatformError>;

    /// 查询二维码当前状态
    async fn poll_challenge(
        &self,
        challenge: &LoginChallenge,
    ) -> Result<ChallengeStatus, PlatformError>;

    /// 用已完成的二维码换取凭证
    async fn resolve_credential(
        &self,
        challenge: &LoginChallenge,
    ) -> Result<Credential, PlatformError>;

    /// 获取当前登录用户资料
    async fn get_self_info(&self, credential: &Credential) -> Result<UserProfile, PlatformError>;

    /// 获取直播间信息
    async fn get_room_info(&self, room_id: RoomId) -> Result<RoomMetadata, PlatformError>;

    /// 获取直播间播放信息
    async fn get_room_play_info(&self, room_id: RoomId) -> Result<PlayInfo, PlatformError>;

    /// 打开弹幕流 (尚未连接)
    ///
    /// 未登录时 `credential` 为 None,平台以游客身份订阅。
    async fn open_event_stream(
        &self,
        room_id: RoomId,
        credential: Option<&Credential>,
    ) -> Result<Box<dyn EventStream>, PlatformError>;

    /// 向直播间发送一条弹幕
    async fn send_message(
        &self,
        room_id: RoomId,
        credential: &Credential,
        text: &str,
    ) -> Result<(), PlatformError>;
}
