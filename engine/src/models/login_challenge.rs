use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 二维码登录挑战
///
/// 追踪从二维码生成到换取凭证的完整登录流程。
/// 由 `LoginService` 独占持有,产出凭证或失败后丢弃。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginChallenge {
    /// 二维码唯一标识 (平台返回的 qrcode_key)
    pub challenge_id: String,

    /// 二维码内容,交由界面层渲染
    pub url: String,

    /// 当前状态
    pub status: ChallengeStatus,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 扫码时间 (可选)
    pub scanned_at: Option<DateTime<Utc>>,

    /// 确认登录时间 (可选)
    pub confirmed_at: Option<DateTime<Utc>>,

    /// 过期时间 (平台通常给出180秒)
    pub expires_at: DateTime<Utc>,
}

/// 二维码状态
///
/// 状态转换流程:
/// Pending -> Scanned -> Confirmed -> Done
///     |          |
///     +----------+---> Expired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    /// 等待扫码
    Pending,

    /// 已扫码,等待确认
    Scanned,

    /// 已在手机端确认
    Confirmed,

    /// 已过期
    Expired,

    /// 登录完成,可换取凭证
    Done,
}

impl LoginChallenge {
    /// 创建新的登录挑战
    ///
    /// # 参数
    /// - `challenge_id`: 平台返回的二维码标识
    /// - `url`: 二维码内容
    /// - `expires_in_seconds`: 过期时长(秒)
    pub fn new(challenge_id: String, url: String, expires_in_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            challenge_id,
            url,
            status: ChallengeStatus::Pending,
            created_at: now,
            scanned_at: None,
            confirmed_at: None,
            expires_at: now + chrono::Duration::seconds(expires_in_seconds),
        }
    }

    /// 检查是否已过期
    pub fn is_expired(&self) -> bool {
        self.status == ChallengeStatus::Expired || Utc::now() > self.expires_at
    }

    /// 是否为终态 (Done 或 Expired)
    ///
    /// 一旦进入终态,不应再进行状态轮询。
    pub fn is_final_status(&self) -> bool {
        matches!(self.status, ChallengeStatus::Done | ChallengeStatus::Expired)
    }

    /// 应用一次轮询结果
    ///
    /// 状态只能前进: 已扫码后再收到 pending 不会回退。
    /// 跳过中间状态时补记对应时间点。
    pub fn apply(&mut self, polled: ChallengeStatus) {
        match polled {
            ChallengeStatus::Pending => {}
            ChallengeStatus::Scanned => {
                if self.status == ChallengeStatus::Pending {
                    self.mark_scanned();
                }
            }
            ChallengeStatus::Confirmed => {
                if self.scanned_at.is_none() {
                    self.mark_scanned();
                }
                self.mark_confirmed();
            }
            ChallengeStatus::Done => {
                if self.confirmed_at.is_none() {
                    self.mark_confirmed();
                }
                self.status = ChallengeStatus::Done;
            }
            ChallengeStatus::Expired => self.mark_expired(),
        }
    }

    /// 更新状态为已扫码
    pub fn mark_scanned(&mut self) {
        self.status = ChallengeStatus::Scanned;
        self.scanned_at = Some(Utc::now());
    }

    /// 更新状态为已确认
    pub fn mark_confirmed(&mut self) {
        self.status = ChallengeStatus::Confirmed;
        self.confirmed_at = Some(Utc::now());
    }

    /// 更新状态为已过期
    pub fn mark_expired(&mut self) {
        self.status = ChallengeStatus::Expired;
    }

    /// 获取会话持续时长(秒)
    pub fn duration_seconds(&self) -> i64 {
        (Utc::now() - self.created_at).num_seconds()
    }

    /// 获取距离过期的剩余秒数
    ///
    /// 返回负数表示已过期。用于前端倒计时显示。
    pub fn remaining_seconds(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }
}
