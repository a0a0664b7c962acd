//! 引擎配置
//!
//! 默认值覆盖全部字段,环境变量(可由 `.env` 文件提供)只做局部覆盖。

use chrono::Duration as ChronoDuration;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// 登录轮询间隔下限 (平台接口的频率限制)
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

const MAX_CREDENTIAL_TTL_HOURS: i64 = 100 * 366 * 24;

/// 日志输出配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志目录
    pub dir: PathBuf,
    /// 日志文件名前缀
    pub file_prefix: String,
}

/// 引擎配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 凭证、设置、历史记录的存放目录
    pub storage_dir: PathBuf,

    /// 本地信任凭证的时长,与平台会话自身的有效期无关
    pub credential_ttl: ChronoDuration,

    /// 二维码状态轮询间隔,不低于1秒
    pub login_poll_interval: Duration,

    /// 页面不可见时最多缓存的事件数
    pub queue_capacity: usize,

    /// 广告发送失败后的退避时长
    pub ad_failure_backoff: Duration,

    /// 历史房间号保留数量
    pub history_limit: usize,

    pub log: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let storage_dir = dirs::data_dir()
            .map(|p| p.join("bili-live-monitor"))
            .unwrap_or_else(|| PathBuf::from("storage"));

        Self {
            log: LogConfig {
                dir: storage_dir.join("logs"),
                file_prefix: "live-monitor".to_string(),
            },
            storage_dir,
            credential_ttl: ChronoDuration::hours(6),
            login_poll_interval: MIN_POLL_INTERVAL,
            queue_capacity: 50,
            ad_failure_backoff: Duration::from_secs(60),
            history_limit: 20,
        }
    }
}

impl EngineConfig {
    /// 以指定存储目录创建配置,其余取默认值
    pub fn with_storage_dir(storage_dir: impl Into<PathBuf>) -> Self {
        let storage_dir = storage_dir.into();
        Self {
            log: LogConfig {
                dir: storage_dir.join("logs"),
                file_prefix: "live-monitor".to_string(),
            },
            storage_dir,
            ..Self::default()
        }
    }

    /// 从环境变量加载配置
    ///
    /// 先尝试加载 `.env` 文件,不存在时沿用进程环境。
    /// 无法解析的值回退到默认值并记录警告。
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            info!(error = %e, "未加载 .env 文件,使用进程环境变量");
        }

        let mut config = match env::var("LIVE_MONITOR_STORAGE_DIR") {
            Ok(dir) if !dir.trim().is_empty() => Self::with_storage_dir(dir.trim()),
            _ => Self::default(),
        };

        if let Some(hours) = parse_var::<i64>("LIVE_MONITOR_CREDENTIAL_TTL_HOURS") {
            match credential_ttl_from_hours(hours) {
                Some(ttl) => config.credential_ttl = ttl,
                None => warn!(hours, "凭证有效期超出范围,使用默认值"),
            }
        }

        if let Some(ms) = parse_var::<u64>("LIVE_MONITOR_POLL_INTERVAL_MS") {
            config.login_poll_interval = Duration::from_millis(ms);
        }

        if let Some(capacity) = parse_var::<usize>("LIVE_MONITOR_QUEUE_CAPACITY") {
            if capacity > 0 {
                config.queue_capacity = capacity;
            }
        }

        if let Some(secs) = parse_var::<u64>("LIVE_MONITOR_AD_BACKOFF_SECS") {
            config.ad_failure_backoff = Duration::from_secs(secs);
        }

        if let Some(limit) = parse_var::<usize>("LIVE_MONITOR_HISTORY_LIMIT") {
            if limit > 0 {
                config.history_limit = limit;
            }
        }

        if let Ok(dir) = env::var("LIVE_MONITOR_LOG_DIR") {
            if !dir.trim().is_empty() {
                config.log.dir = PathBuf::from(dir.trim());
            }
        }

        config.normalized()
    }

    /// 修正越界的取值
    pub fn normalized(mut self) -> Self {
        if self.login_poll_interval < MIN_POLL_INTERVAL {
            warn!(
                requested_ms = self.login_poll_interval.as_millis() as u64,
                "登录轮询间隔低于1秒,已调整为1秒"
            );
            self.login_poll_interval = MIN_POLL_INTERVAL;
        }
        self
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.storage_dir.join("credentials.json")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.storage_dir.join("settings.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.storage_dir.join("monitor_history.json")
    }
}

/// 凭证有效期必须为正数,且不超过一百年
fn credential_ttl_from_hours(hours: i64) -> Option<ChronoDuration> {
    if hours <= 0 || hours > MAX_CREDENTIAL_TTL_HOURS {
        return None;
    }
    ChronoDuration::try_hours(hours)
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "环境变量格式错误,使用默认值");
            None
        }
    }
}
