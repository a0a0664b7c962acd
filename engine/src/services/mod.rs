//! 服务层模块
//!
//! 包含所有业务逻辑服务:
//! - `platform`: 直播平台能力抽象 (登录、房间信息、弹幕流、发送弹幕)
//! - `credential_store`: 凭证持久化与本地过期判断
//! - `login_service`: 扫码登录流程
//! - `room_connection`: 单房间弹幕连接与事件分类
//! - `event_queue`: 页面不可见时的有界事件缓冲
//! - `ad_scheduler`: 定时广告任务组
//! - `thank_responder`: 礼物答谢
//! - `monitor_controller`: 监控会话的启动与停止
//! - `settings_store` / `room_history`: 本地设置与历史房间号
//!
//! # 服务架构
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              MonitorController               │
//! │  ┌──────────────┐ ┌──────────┐ ┌───────────┐ │
//! │  │RoomConnection│ │AdScheduler│ │ThankResp. │ │
//! │  └──────┬───────┘ └────┬─────┘ └─────┬─────┘ │
//! │         │    EventQueue│             │       │
//! └─────────┼──────────────┼─────────────┼───────┘
//!           ▼              ▼             ▼
//!      LivePlatform   SettingsProvider  CredentialStore
//! ```
//!
//! 日志中不记录凭证令牌。

pub mod ad_scheduler;
pub mod credential_store;
pub mod event_parser;
pub mod event_queue;
pub mod file_store;
pub mod login_service;
pub mod monitor_controller;
pub mod platform;
pub mod room_connection;
pub mod room_history;
pub mod settings_store;
pub mod thank_responder;

// 重导出常用类型,简化外部引用
pub use ad_scheduler::AdScheduler;
pub use credential_store::CredentialStore;
pub use event_queue::{EventQueue, EventSink};
pub use login_service::LoginService;
pub use monitor_controller::MonitorController;
pub use platform::{EventCallback, EventStream, LivePlatform};
pub use room_connection::{EventSender, RoomConnection};
pub use room_history::RoomHistory;
pub use settings_store::{AdListEditor, JsonSettingsStore, SettingsProvider};
pub use thank_responder::ThankResponder;
