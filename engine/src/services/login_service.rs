//! 扫码登录
//!
//! 流程: generate 生成二维码 -> poll_until_done 轮询 -> 换取凭证并保存。
//! 二维码过期或查询失败时由调用方重新生成,这里不自动重试。

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::MIN_POLL_INTERVAL;
use crate::models::{AuthError, ChallengeStatus, Credential, LoginChallenge, UserProfile};
use crate::services::credential_store::CredentialStore;
use crate::services::platform::LivePlatform;

pub struct LoginService {
    platform: Arc<dyn LivePlatform>,
    credentials: Arc<CredentialStore>,
    poll_interval: Duration,
}

impl LoginService {
    /// `poll_interval` 低于1秒时按1秒处理
    pub fn new(
        platform: Arc<dyn LivePlatform>,
        credentials: Arc<CredentialStore>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            platform,
            credentials,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// 生成新的登录二维码
    pub async fn generate(&self) -> Result<LoginChallenge, AuthError> {
        let challenge = self
            .platform
            .generate_login_challenge()
            .await
            .map_err(AuthError::ChallengeFailed)?;

        info!(
            challenge_id = %challenge.challenge_id,
            expires_in = challenge.remaining_seconds(),
            "登录二维码已生成"
        );
        Ok(challenge)
    }

    /// 轮询二维码直到登录完成
    ///
    /// 完成后换取凭证并交给凭证存储保存。
    /// 二维码过期返回 `ChallengeExpired`,查询失败返回 `PollFailed`。
    pub async fn poll_until_done(
        &self,
        challenge: &mut LoginChallenge,
    ) -> Result<Credential, AuthError> {
        loop {
            if challenge.status == ChallengeStatus::Expired || challenge.is_expired() {
                challenge.mark_expired();
                info!(challenge_id = %challenge.challenge_id, "二维码已过期");
                return Err(AuthError::ChallengeExpired);
            }

            let polled = self
                .platform
                .poll_challenge(challenge)
                .await
                .map_err(|e| {
                    warn!(challenge_id = %challenge.challenge_id, error = %e, "查询二维码状态失败");
                    AuthError::PollFailed(e)
                })?;

            let previous = challenge.status;
            challenge.apply(polled);
            if challenge.status != previous {
                debug!(
                    challenge_id = %challenge.challenge_id,
                    from = ?previous,
                    to = ?challenge.status,
                    "二维码状态变化"
                );
            }

            if challenge.status == ChallengeStatus::Done {
                return self.complete(challenge).await;
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn complete(&self, challenge: &LoginChallenge) -> Result<Credential, AuthError> {
        let credential = self
            .platform
            .resolve_credential(challenge)
            .await
            .map_err(AuthError::PollFailed)?;

        if !self.credentials.save(&credential) {
            return Err(AuthError::PersistFailed);
        }

        info!(
            credential = %credential.sample_for_logging(),
            duration_secs = challenge.duration_seconds(),
            "登录成功"
        );
        Ok(credential)
    }

    /// 获取当前登录用户资料,用于界面展示
    pub async fn current_user(&self) -> Option<UserProfile> {
        let credential = self.credentials.require_valid().ok()?;
        match self.platform.get_self_info(&credential).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "获取用户信息失败");
                None
            }
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.credentials.is_valid()
    }

    /// 退出登录,删除本地凭证
    pub fn logout(&self) -> bool {
        info!("退出登录");
        self.credentials.clear()
    }
}
