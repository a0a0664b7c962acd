//! 数据模型模块
//!
//! 包含所有核心数据结构:
//! - errors: 错误类型定义 (平台、认证、连接、发送、解析、配置)
//! - credential: 登录凭证与带过期时间的持久化记录
//! - login_challenge: 二维码登录挑战 (状态追踪)
//! - room: 房间号与房间展示信息
//! - events: 已分类事件与连接状态
//! - settings: 答谢/定时广告设置
//!
//! 敏感数据不记录到日志 (如凭证令牌)。

pub mod credential;
pub mod errors;
pub mod events;
pub mod login_challenge;
pub mod room;
pub mod settings;

// 重导出常用类型,简化外部引用
pub use credential::{Credential, CredentialRecord};
pub use errors::{
    AuthError, ConfigError, ConnectError, MonitorError, ParseError, PlatformError, SendError,
};
pub use events::{ClassifiedEvent, ConnectionState};
pub use login_challenge::{ChallengeStatus, LoginChallenge};
pub use room::{PlayInfo, RoomDetails, RoomId, RoomMetadata, UserProfile};
pub use settings::{AdEntry, AdUnit, MonitorSettings, DEFAULT_THANK_TEMPLATE};
