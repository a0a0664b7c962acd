//! 登录凭证存储
//!
//! 职责: 持久化凭证并按固定TTL判断本地是否仍信任它。
//! 过期采用惰性检查 (加载与有效性查询时),不使用后台定时器。

use chrono::Duration;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info, warn};

use crate::models::{AuthError, ConfigError, Credential, CredentialRecord};
use crate::services::file_store;
use crate::utils::Clock;

/// 凭证存储
///
/// 唯一的凭证写入方 (连同登录服务),其余组件只读。
pub struct CredentialStore {
    /// 凭证文件路径
    path: PathBuf,

    /// 本地信任时长
    ttl: Duration,

    clock: Arc<dyn Clock>,

    /// 内存中的当前凭证
    current: RwLock<Option<Credential>>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            ttl,
            clock,
            current: RwLock::new(None),
        }
    }

    /// 从本地加载凭证
    ///
    /// 以下情况返回 None 并删除持久化记录:
    /// - 记录已过期
    /// - 记录无法解析 (包括缺少 `expires_at`)
    pub fn load(&self) -> Option<Credential> {
        let record = match file_store::load_json::<CredentialRecord>(&self.path) {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(path = %self.path.display(), "凭证文件不存在");
                return None;
            }
            Err(ConfigError::Malformed { message, .. }) => {
                warn!(error = %message, "凭证文件损坏,已删除");
                self.clear();
                return None;
            }
            Err(e) => {
                error!(error = %e, "加载凭证失败");
                self.set_current(None);
                return None;
            }
        };

        if record.is_expired_at(self.clock.now()) {
            info!(expires_at = %record.expires_at, "凭证已过期,需要重新登录");
            self.clear();
            return None;
        }

        info!(
            credential = %record.credential.sample_for_logging(),
            expires_at = %record.expires_at,
            "凭证加载成功"
        );
        self.set_current(Some(record.credential.clone()));
        Some(record.credential)
    }

    /// 保存凭证
    ///
    /// `expires_at = now + ttl`,文件权限仅限所有者。
    /// I/O失败返回 false,调用方不自动重试。
    pub fn save(&self, credential: &Credential) -> bool {
        let Some(record) = CredentialRecord::new(credential.clone(), self.clock.now(), self.ttl)
        else {
            error!(ttl_hours = self.ttl.num_hours(), "凭证过期时间超出范围,未保存");
            return false;
        };

        match file_store::save_json(&self.path, &record, true) {
            Ok(()) => {
                self.set_current(Some(credential.clone()));
                info!(
                    credential = %credential.sample_for_logging(),
                    ttl_hours = self.ttl.num_hours(),
                    "凭证已保存"
                );
                true
            }
            Err(e) => {
                error!(error = %e, "保存凭证失败");
                false
            }
        }
    }

    /// 清除凭证 (文件与内存)
    ///
    /// 幂等: 记录不存在也视为成功。
    pub fn clear(&self) -> bool {
        self.set_current(None);
        match file_store::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "凭证已清除");
                true
            }
            Err(e) => {
                error!(error = %e, "清除凭证失败");
                false
            }
        }
    }

    /// 当前凭证是否有效
    ///
    /// 需同时满足: 内存中有凭证、持久化记录存在且未过期。
    /// 每次都重新读取文件,外部删除记录会立即生效。
    pub fn is_valid(&self) -> bool {
        if self.current().is_none() {
            return false;
        }

        match file_store::load_json::<CredentialRecord>(&self.path) {
            Ok(Some(record)) => !record.is_expired_at(self.clock.now()),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "检查凭证有效性失败");
                false
            }
        }
    }

    /// 内存中的当前凭证 (不检查过期)
    pub fn current(&self) -> Option<Credential> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 获取有效凭证,否则给出认证错误
    pub fn require_valid(&self) -> Result<Credential, AuthError> {
        let credential = self.current().ok_or(AuthError::NotLoggedIn)?;
        if self.is_valid() {
            Ok(credential)
        } else {
            Err(AuthError::CredentialExpired)
        }
    }

    fn set_current(&self, credential: Option<Credential>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = credential;
    }
}
