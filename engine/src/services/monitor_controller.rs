//! 监控会话控制器
//!
//! 职责: 确保同一时间只有一个活跃的监控会话
//! 策略: 新会话启动前先完整停止旧会话 (广告任务与弹幕连接都等待退出)
//!
//! 会话内部的数据流:
//!
//! ```text
//! 弹幕流回调 ──┐
//!              ├─> mpsc ─> 分发任务 ─> EventQueue ─> 界面
//! 广告任务 ────┘              │
//!                             └─> mpsc ─> 答谢任务 ─> ThankResponder (礼物)
//! ```
//!
//! 答谢在独立任务中发送,网络调用不会阻塞界面分发。

use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::settings::keys;
use crate::models::{
    ClassifiedEvent, ConnectionState, MonitorError, RoomDetails, RoomId, SendError,
};
use crate::services::ad_scheduler::AdScheduler;
use crate::services::credential_store::CredentialStore;
use crate::services::event_queue::EventQueue;
use crate::services::platform::LivePlatform;
use crate::services::room_connection::{EventSender, RoomConnection};
use crate::services::room_history::RoomHistory;
use crate::services::settings_store::SettingsProvider;
use crate::services::thank_responder::ThankResponder;

/// 当前监控会话
struct MonitorSession {
    id: Uuid,
    room_id: RoomId,
    events: EventSender,
    /// 通知分发任务取走剩余事件后退出
    closing: CancellationToken,
    dispatcher: JoinHandle<()>,
    thanker: JoinHandle<()>,
    watcher: JoinHandle<()>,
}

pub struct MonitorController {
    platform: Arc<dyn LivePlatform>,
    credentials: Arc<CredentialStore>,
    settings: Arc<dyn SettingsProvider>,
    history: RoomHistory,
    connection: Arc<RoomConnection>,
    ads: AdScheduler,
    thanks: Arc<ThankResponder>,
    queue: Arc<EventQueue>,
    is_monitoring: Arc<AtomicBool>,
    session: Mutex<Option<MonitorSession>>,
}

impl MonitorController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        platform: Arc<dyn LivePlatform>,
        credentials: Arc<CredentialStore>,
        settings: Arc<dyn SettingsProvider>,
        history: RoomHistory,
        connection: Arc<RoomConnection>,
        ads: AdScheduler,
        thanks: Arc<ThankResponder>,
        queue: Arc<EventQueue>,
        is_monitoring: Arc<AtomicBool>,
    ) -> Self {
        Self {
            platform,
            credentials,
            settings,
            history,
            connection,
            ads,
            thanks,
            queue,
            is_monitoring,
            session: Mutex::new(None),
        }
    }

    /// 开始监控直播间
    ///
    /// 顺序: 停止旧会话 -> 获取房间信息 (仅展示) -> 连接弹幕流
    /// -> 标记监控中 -> 启动定时广告 -> 写入历史记录。
    /// 房间信息获取失败不影响连接,此时返回 `Ok(None)`。
    pub async fn start_monitoring(
        &self,
        room_id: RoomId,
    ) -> Result<Option<RoomDetails>, MonitorError> {
        let mut session = self.session.lock().await;
        if let Some(old) = session.take() {
            info!(old_room = %old.room_id, new_room = %room_id, "切换直播间,停止旧会话");
            self.teardown(old).await;
        }

        let details = self.fetch_room_details(room_id).await;

        let credential = match self.credentials.require_valid() {
            Ok(credential) => Some(credential),
            Err(e) => {
                info!(error = %e, "未登录,以游客身份连接");
                None
            }
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.connection
            .start(room_id, credential, events_tx.clone())
            .await?;

        self.is_monitoring.store(true, Ordering::SeqCst);

        let (gifts_tx, gifts_rx) = mpsc::unbounded_channel();
        let thanker = tokio::spawn(send_thanks(room_id, gifts_rx, self.thanks.clone()));
        let closing = CancellationToken::new();
        let dispatcher = tokio::spawn(dispatch_events(
            room_id,
            events_rx,
            self.queue.clone(),
            gifts_tx,
            closing.clone(),
        ));
        let watcher = tokio::spawn(watch_failure(
            room_id,
            self.connection.subscribe(),
            self.is_monitoring.clone(),
        ));

        self.ads.start(room_id, events_tx.clone()).await;
        self.history.add(room_id);

        let id = Uuid::new_v4();
        info!(session_id = %id, room_id = %room_id, "弹幕监控已启动");
        *session = Some(MonitorSession {
            id,
            room_id,
            events: events_tx,
            closing,
            dispatcher,
            thanker,
            watcher,
        });

        Ok(details)
    }

    /// 停止监控
    ///
    /// 返回时所有广告任务已退出,弹幕连接已断开。
    pub async fn stop_monitoring(&self) {
        let mut session = self.session.lock().await;
        match session.take() {
            Some(old) => self.teardown(old).await,
            None => {
                self.is_monitoring.store(false, Ordering::SeqCst);
                self.connection.stop().await;
            }
        }
    }

    async fn teardown(&self, session: MonitorSession) {
        self.is_monitoring.store(false, Ordering::SeqCst);
        let stopped = self.ads.stop().await;
        self.connection.stop().await;

        // 广告任务与连接回调都已停止,剩余事件只会来自通道中已有的部分
        session.watcher.abort();
        drop(session.events);
        session.closing.cancel();
        if let Err(e) = session.dispatcher.await {
            warn!(room_id = %session.room_id, error = %e, "事件分发任务异常退出");
        }
        // 进行中的答谢发往已断开的房间,直接放弃
        session.thanker.abort();

        info!(
            session_id = %session.id,
            room_id = %session.room_id,
            ad_tasks = stopped,
            "弹幕监控已停止"
        );
    }

    async fn fetch_room_details(&self, room_id: RoomId) -> Option<RoomDetails> {
        let metadata = match self.platform.get_room_info(room_id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "获取房间信息失败");
                return None;
            }
        };

        let play_info = match self.platform.get_room_play_info(room_id).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "获取播放信息失败");
                None
            }
        };

        debug!(
            room_id = %room_id,
            title = %metadata.title,
            status = metadata.live_status_text(),
            "房间信息"
        );
        Some(RoomDetails {
            room_id,
            metadata,
            play_info,
        })
    }

    /// 页面可见性变化
    pub fn set_visible(&self, visible: bool) {
        self.queue.set_visible(visible);
    }

    /// 切换定时广告开关
    ///
    /// 设置立即持久化;监控中时开启会重启广告任务,关闭会停止它们。
    pub async fn set_ad_enabled(&self, enabled: bool) -> bool {
        if !self.settings.set(keys::AD_ENABLED, json!(enabled)) {
            return false;
        }

        let session = self.session.lock().await;
        if let Some(active) = session.as_ref() {
            if self.is_monitoring() {
                if enabled {
                    self.ads.start(active.room_id, active.events.clone()).await;
                } else {
                    self.ads.stop().await;
                }
            }
        }
        true
    }

    /// 用户手动发送弹幕,不重试
    pub async fn send_message(&self, text: &str) -> Result<(), MonitorError> {
        let room_id = self.current_room().ok_or(SendError::NotConnected)?;
        self.connection.send_text(room_id, text).await?;
        Ok(())
    }

    pub fn room_history(&self) -> Vec<RoomId> {
        self.history.load()
    }

    pub fn current_room(&self) -> Option<RoomId> {
        self.connection.active_room()
    }

    pub fn is_monitoring(&self) -> bool {
        self.is_monitoring.load(Ordering::SeqCst)
    }

    /// 当前会话ID,未监控时为 None
    pub async fn session_id(&self) -> Option<Uuid> {
        self.session.lock().await.as_ref().map(|s| s.id)
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// 状态栏文本
    pub fn status_text(&self) -> String {
        if self.is_monitoring() {
            if self.settings.flag(keys::AD_ENABLED) {
                "弹幕监控已启动（定时广告已启用）".to_string()
            } else {
                "弹幕监控已启动".to_string()
            }
        } else {
            self.connection.state().status_text()
        }
    }
}

/// 会话分发任务: 事件进界面队列,礼物转交答谢任务
///
/// `closing` 触发后取完通道中已有的事件再退出。
async fn dispatch_events(
    room_id: RoomId,
    mut events: mpsc::UnboundedReceiver<ClassifiedEvent>,
    queue: Arc<EventQueue>,
    gifts: mpsc::UnboundedSender<ClassifiedEvent>,
    closing: CancellationToken,
) {
    let forward = |event: ClassifiedEvent| {
        if matches!(event, ClassifiedEvent::Gift { .. }) {
            queue.dispatch(event.clone());
            let _ = gifts.send(event);
        } else {
            queue.dispatch(event);
        }
    };

    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Some(event) => forward(event),
                None => break,
            },
            _ = closing.cancelled() => break,
        }
    }
    while let Ok(event) = events.try_recv() {
        forward(event);
    }
    debug!(room_id = %room_id, "事件分发结束");
}

/// 答谢任务: 按到达顺序逐条发送
async fn send_thanks(
    room_id: RoomId,
    mut gifts: mpsc::UnboundedReceiver<ClassifiedEvent>,
    thanks: Arc<ThankResponder>,
) {
    while let Some(gift) = gifts.recv().await {
        thanks.handle(room_id, &gift).await;
    }
}

/// 连接失败后标记监控结束,广告任务在下一次检查时退出
async fn watch_failure(
    room_id: RoomId,
    mut state: watch::Receiver<ConnectionState>,
    is_monitoring: Arc<AtomicBool>,
) {
    loop {
        let failed = matches!(
            &*state.borrow_and_update(),
            ConnectionState::Failed { room_id: id, .. } if *id == room_id
        );
        if failed {
            is_monitoring.store(false, Ordering::SeqCst);
            error!(room_id = %room_id, "弹幕连接失败,监控已停止");
            break;
        }
        if state.changed().await.is_err() {
            break;
        }
    }
}
