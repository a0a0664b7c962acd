//! 直播间弹幕监控引擎
//!
//! 扫码登录、单房间弹幕/礼物监控、礼物答谢与定时广告。
//! 直播平台协议由宿主通过 [`services::LivePlatform`] 注入,
//! 界面通过 [`services::EventSink`] 接收事件。

pub mod config;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

pub use config::EngineConfig;
pub use state::AppState;
