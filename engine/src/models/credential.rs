use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// 登录凭证
///
/// 扫码登录成功后由平台下发,所有发送路径只读共享。
/// 敏感字段永不写入日志,使用 `sample_for_logging` 获取脱敏视图。
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// 会话令牌 (SESSDATA)
    pub session_token: String,

    /// CSRF令牌 (bili_jct)
    pub csrf_token: String,

    /// 用户ID (DedeUserID)
    pub user_id: String,

    /// 刷新用的辅助值 (ac_time_value),可能为空
    #[serde(default)]
    pub refresh_value: Option<String>,
}

impl Credential {
    pub fn new(session_token: String, csrf_token: String, user_id: String) -> Self {
        Self {
            session_token,
            csrf_token,
            user_id,
            refresh_value: None,
        }
    }

    /// 设置刷新值 (构建器模式)
    pub fn with_refresh_value(mut self, refresh_value: String) -> Self {
        self.refresh_value = Some(refresh_value);
        self
    }

    /// 脱敏后的日志样本
    ///
    /// 只包含用户ID与各字段是否存在,不含任何令牌值。
    pub fn sample_for_logging(&self) -> String {
        format!(
            "user_id={}, session_token={}, csrf_token={}, refresh_value={}",
            self.user_id,
            presence(&self.session_token),
            presence(&self.csrf_token),
            self.refresh_value.as_deref().map(presence).unwrap_or("absent"),
        )
    }
}

fn presence(value: &str) -> &'static str {
    if value.is_empty() {
        "empty"
    } else {
        "present"
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("session_token", &"***")
            .field("csrf_token", &"***")
            .finish()
    }
}

/// 持久化的凭证记录
///
/// `expires_at` 不可缺省: 没有过期时间的记录在加载时视为损坏。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(flatten)]
    pub credential: Credential,

    /// 本地信任截止时间 (保存时刻 + 固定TTL)
    pub expires_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// 以保存时刻和TTL创建记录
    ///
    /// 过期时间超出可表示范围时返回 None。
    pub fn new(credential: Credential, saved_at: DateTime<Utc>, ttl: Duration) -> Option<Self> {
        let expires_at = saved_at.checked_add_signed(ttl)?;
        Some(Self {
            credential,
            expires_at,
        })
    }

    /// `now` 严格晚于 `expires_at` 时过期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
