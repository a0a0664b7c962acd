use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::RoomId;

/// 远程平台调用相关错误
///
/// 平台协作方(登录、房间信息、弹幕流、发送弹幕)报告的失败。
/// 本引擎不解释协议细节,只保留足够的上下文用于日志和状态提示。
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error", content = "details")]
pub enum PlatformError {
    /// 网络请求失败
    ///
    /// 可能原因:
    /// - 网络连接中断
    /// - 平台服务器不可达
    #[error("网络请求失败: {0}")]
    NetworkFailed(String),

    /// 平台返回了业务错误码
    #[error("平台返回错误 {code}: {message}")]
    Rejected { code: i64, message: String },

    /// 响应格式无效
    #[error("响应格式无效: {0}")]
    InvalidResponse(String),
}

/// 持久化配置相关错误
///
/// 读取设置、历史记录或凭证文件时的失败。
/// 恢复策略统一为: 视为空/默认值,并记录日志。
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum ConfigError {
    /// JSON格式损坏
    #[error("配置文件格式错误 {path}: {message}")]
    Malformed { path: String, message: String },

    /// 文件读写失败
    #[error("配置文件读写失败 {path}: {message}")]
    Io { path: String, message: String },
}

/// 认证相关错误
///
/// 凭证缺失/过期,或登录二维码流程失败。
/// 统一向用户呈现为"未登录",由上层触发重新登录。
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error", content = "details")]
pub enum AuthError {
    /// 本地没有可用凭证
    #[error("未登录")]
    NotLoggedIn,

    /// 本地凭证已过期
    #[error("登录已过期,请重新登录")]
    CredentialExpired,

    /// 二维码已过期,调用方需要重新生成
    #[error("二维码已过期,请刷新二维码")]
    ChallengeExpired,

    /// 生成二维码失败
    #[error("生成二维码失败: {0}")]
    ChallengeFailed(PlatformError),

    /// 轮询二维码状态失败
    #[error("登录状态查询失败: {0}")]
    PollFailed(PlatformError),

    /// 凭证保存失败
    #[error("凭证保存失败")]
    PersistFailed,
}

/// 弹幕连接建立失败
///
/// 失败即终态: 不自动重连,直到调用方再次 start。
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error", content = "details")]
pub enum ConnectError {
    /// 打开弹幕流失败
    #[error("弹幕连接失败: {0}")]
    OpenFailed(PlatformError),

    /// 弹幕流在运行中断开
    #[error("弹幕连接已断开: {0}")]
    StreamClosed(String),
}

/// 发送弹幕失败
///
/// 仅在定时广告任务内部按固定退避重试;
/// 用户手动发送与答谢弹幕从不重试。
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error", content = "details")]
pub enum SendError {
    /// 文本去除首尾空白后为空
    #[error("弹幕内容为空")]
    EmptyText,

    /// 没有凭证或没有活跃房间
    #[error("未连接直播间或未登录,无法发送弹幕")]
    NotConnected,

    /// 目标房间不是当前活跃房间
    #[error("房间 {requested} 不是当前监控的房间")]
    RoomMismatch { requested: RoomId },

    /// 平台发送失败
    #[error("发送弹幕失败: {0}")]
    RemoteError(PlatformError),
}

/// 弹幕流消息解析失败
///
/// 只在日志中出现: 解析失败的消息被丢弃,连接保持。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// 缺少必需字段
    #[error("消息缺少字段: {0}")]
    MissingField(&'static str),

    /// 字段类型不符
    #[error("字段类型错误: {0}")]
    InvalidField(&'static str),

    /// 未知的事件类型
    #[error("未知事件类型: {0}")]
    UnknownType(String),
}

/// 监控控制器对外错误
///
/// 汇总各组件错误,`user_message` 给出可直接展示的短状态文本。
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("房间号无效: {0}")]
    InvalidRoomId(String),
}

impl MonitorError {
    /// 面向用户的状态文本
    ///
    /// 不包含底层错误细节,只给出操作者能理解的一句话。
    pub fn user_message(&self) -> String {
        match self {
            MonitorError::Auth(AuthError::NotLoggedIn) => "未登录".to_string(),
            MonitorError::Auth(_) => "登录失效,请重新登录".to_string(),
            MonitorError::Connect(_) => "弹幕连接失败".to_string(),
            MonitorError::Send(SendError::EmptyText) => "弹幕内容为空".to_string(),
            MonitorError::Send(SendError::NotConnected) => "未开始监控".to_string(),
            MonitorError::Send(_) => "发送弹幕失败".to_string(),
            MonitorError::Config(_) => "配置读取失败,已使用默认配置".to_string(),
            MonitorError::InvalidRoomId(_) => "房间号必须是正整数".to_string(),
        }
    }
}

impl From<std::io::Error> for PlatformError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => PlatformError::NetworkFailed("请求超时".to_string()),
            std::io::ErrorKind::ConnectionRefused => {
                PlatformError::NetworkFailed("无法连接到服务器".to_string())
            }
            _ => PlatformError::NetworkFailed(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        PlatformError::InvalidResponse(err.to_string())
    }
}
