use crate::config::EngineConfig;
use crate::services::{
    AdListEditor, AdScheduler, CredentialStore, EventQueue, EventSink, JsonSettingsStore,
    LivePlatform, LoginService, MonitorController, RoomConnection, RoomHistory, SettingsProvider,
    ThankResponder,
};
use crate::utils::{Clock, SystemClock};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// 应用全局状态
///
/// 每个字段是对应能力的唯一实例,由宿主持有并按引用传递,
/// 没有进程级的全局变量。
/// - credentials: 凭证的唯一存储
/// - settings: 答谢与广告设置
/// - login: 扫码登录
/// - monitor: 监控会话
pub struct AppState {
    pub config: EngineConfig,

    pub credentials: Arc<CredentialStore>,

    pub settings: Arc<dyn SettingsProvider>,

    pub login: Arc<LoginService>,

    pub monitor: Arc<MonitorController>,
}

impl AppState {
    /// 初始化应用状态
    ///
    /// 按配置打开本地存储,并尝试恢复上次保存的凭证。
    /// `sink` 接收分发给界面的事件。
    pub fn new(
        config: EngineConfig,
        platform: Arc<dyn LivePlatform>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self::with_clock(config, platform, sink, Arc::new(SystemClock))
    }

    /// 使用指定时钟初始化,凭证过期判断以该时钟为准
    pub fn with_clock(
        config: EngineConfig,
        platform: Arc<dyn LivePlatform>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = config.normalized();

        let credentials = Arc::new(CredentialStore::new(
            config.credentials_path(),
            config.credential_ttl,
            clock,
        ));
        credentials.load();

        let settings: Arc<dyn SettingsProvider> =
            Arc::new(JsonSettingsStore::open(config.settings_path()));

        let login = Arc::new(LoginService::new(
            platform.clone(),
            credentials.clone(),
            config.login_poll_interval,
        ));

        let is_monitoring = Arc::new(AtomicBool::new(false));
        let connection = Arc::new(RoomConnection::new(platform.clone(), credentials.clone()));
        let ads = AdScheduler::new(
            connection.clone(),
            settings.clone(),
            is_monitoring.clone(),
            config.ad_failure_backoff,
        );
        let thanks = Arc::new(ThankResponder::new(connection.clone(), settings.clone()));
        let queue = Arc::new(EventQueue::new(sink, config.queue_capacity));

        let monitor = Arc::new(MonitorController::new(
            platform,
            credentials.clone(),
            settings.clone(),
            RoomHistory::new(config.history_path(), config.history_limit),
            connection,
            ads,
            thanks,
            queue,
            is_monitoring,
        ));

        tracing::info!(
            storage_dir = %config.storage_dir.display(),
            logged_in = credentials.is_valid(),
            "AppState initialized"
        );

        Self {
            config,
            credentials,
            settings,
            login,
            monitor,
        }
    }

    /// 广告列表编辑器
    pub fn ad_list(&self) -> AdListEditor<'_> {
        AdListEditor::new(self.settings.as_ref())
    }

    /// 退出登录
    ///
    /// 只清除凭证,不影响正在进行的监控会话。
    pub fn logout(&self) -> bool {
        self.login.logout()
    }
}
