//! 直播间弹幕连接
//!
//! 职责: 同一时间只维护一个房间的弹幕流订阅
//! 策略: 新连接建立前先关闭旧连接,失败后不自动重连
//!
//! 连接在后台任务中运行,状态通过 `watch` 通道发布,
//! 连接错误不会跨越任务边界抛给调用方。

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::models::{ClassifiedEvent, ConnectError, ConnectionState, Credential, RoomId, SendError};
use crate::services::credential_store::CredentialStore;
use crate::services::event_parser;
use crate::services::platform::{
    EventCallback, EventStream, LivePlatform, EVENT_DANMAKU, EVENT_GIFT, EVENT_VERIFIED,
};

/// 已分类事件的发送端
pub type EventSender = mpsc::UnboundedSender<ClassifiedEvent>;

/// 当前活跃的订阅
struct ActiveStream {
    room_id: RoomId,
    stream: Arc<dyn EventStream>,
    task: JoinHandle<()>,
    /// 已请求断开,此后回调与后台任务都不再修改状态
    stopping: Arc<AtomicBool>,
}

pub struct RoomConnection {
    platform: Arc<dyn LivePlatform>,
    credentials: Arc<CredentialStore>,

    /// 串行化 start/stop
    lifecycle: tokio::sync::Mutex<()>,

    active: Mutex<Option<ActiveStream>>,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl RoomConnection {
    pub fn new(platform: Arc<dyn LivePlatform>, credentials: Arc<CredentialStore>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            platform,
            credentials,
            lifecycle: tokio::sync::Mutex::new(()),
            active: Mutex::new(None),
            state: Arc::new(state),
        }
    }

    /// 订阅连接状态变化
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// 当前绑定的房间
    ///
    /// 连接进入 Failed 后订阅已失效,此时返回 None。
    pub fn active_room(&self) -> Option<RoomId> {
        if self.state.borrow().is_failed() {
            return None;
        }
        self.lock_active().as_ref().map(|active| active.room_id)
    }

    /// 连接到直播间
    ///
    /// 先关闭已有连接,再打开新的订阅并在后台发起连接。
    /// 返回时状态为 Connecting;打开订阅失败则直接进入 Failed。
    /// 解析出的事件发送到 `events`。
    pub async fn start(
        &self,
        room_id: RoomId,
        credential: Option<Credential>,
        events: EventSender,
    ) -> Result<(), ConnectError> {
        let _guard = self.lifecycle.lock().await;
        self.stop_inner().await;

        info!(room_id = %room_id, logged_in = credential.is_some(), "连接弹幕服务器");
        self.state.send_replace(ConnectionState::Connecting { room_id });

        let mut stream = match self
            .platform
            .open_event_stream(room_id, credential.as_ref())
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                error!(room_id = %room_id, error = %e, "打开弹幕流失败");
                let err = ConnectError::OpenFailed(e);
                self.state.send_replace(ConnectionState::Failed {
                    room_id,
                    error: err.clone(),
                });
                return Err(err);
            }
        };

        let stopping = Arc::new(AtomicBool::new(false));
        let self_uid = credential.map(|c| c.user_id);

        for event_type in [EVENT_DANMAKU, EVENT_GIFT] {
            stream.register(
                event_type,
                classify_callback(event_type, self_uid.clone(), events.clone(), stopping.clone()),
            );
        }
        stream.register(
            EVENT_VERIFIED,
            verified_callback(room_id, self.state.clone(), stopping.clone()),
        );

        let stream: Arc<dyn EventStream> = Arc::from(stream);
        let task = tokio::spawn(run_stream(
            room_id,
            stream.clone(),
            self.state.clone(),
            stopping.clone(),
        ));

        *self.lock_active() = Some(ActiveStream {
            room_id,
            stream,
            task,
            stopping,
        });
        Ok(())
    }

    /// 向当前房间发送弹幕
    ///
    /// 不重试,失败原样返回给调用方。
    pub async fn send_text(&self, room_id: RoomId, text: &str) -> Result<(), SendError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendError::EmptyText);
        }

        let active_room = self.active_room().ok_or(SendError::NotConnected)?;
        let credential = self.credentials.current().ok_or(SendError::NotConnected)?;
        if active_room != room_id {
            return Err(SendError::RoomMismatch { requested: room_id });
        }

        self.platform
            .send_message(room_id, &credential, text)
            .await
            .map_err(|e| {
                warn!(room_id = %room_id, error = %e, "发送弹幕失败");
                SendError::RemoteError(e)
            })?;

        debug!(room_id = %room_id, chars = text.chars().count(), "弹幕已发送");
        Ok(())
    }

    /// 断开连接
    ///
    /// 等待平台断开完成后再释放订阅;无论断开是否出错,
    /// 本地状态都会回到 Idle。
    pub async fn stop(&self) {
        let _guard = self.lifecycle.lock().await;
        self.stop_inner().await;
    }

    async fn stop_inner(&self) {
        let active = self.lock_active().take();
        let Some(active) = active else {
            let failed = self.state.borrow().is_failed();
            if failed {
                self.state.send_replace(ConnectionState::Idle);
            }
            return;
        };

        let room_id = active.room_id;
        active.stopping.store(true, Ordering::SeqCst);
        self.state.send_replace(ConnectionState::Disconnecting { room_id });

        match active.stream.disconnect().await {
            Ok(()) => debug!(room_id = %room_id, "弹幕流已断开"),
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "断开弹幕流出错,强制结束连接任务");
                active.task.abort();
            }
        }

        if let Err(e) = active.task.await {
            if !e.is_cancelled() {
                error!(room_id = %room_id, error = %e, "连接任务异常退出");
            }
        }

        self.state.send_replace(ConnectionState::Idle);
        info!(room_id = %room_id, "已断开弹幕连接");
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveStream>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 后台运行接收循环,结束后根据是否为主动断开决定状态
async fn run_stream(
    room_id: RoomId,
    stream: Arc<dyn EventStream>,
    state: Arc<watch::Sender<ConnectionState>>,
    stopping: Arc<AtomicBool>,
) {
    let result = stream.connect().await;
    if stopping.load(Ordering::SeqCst) {
        return;
    }

    let was_connected = matches!(*state.borrow(), ConnectionState::Connected { .. });
    let error = match result {
        Ok(()) => ConnectError::StreamClosed("服务器关闭了连接".to_string()),
        Err(e) if was_connected => ConnectError::StreamClosed(e.to_string()),
        Err(e) => ConnectError::OpenFailed(e),
    };

    error!(room_id = %room_id, error = %error, "弹幕连接失败,不会自动重连");
    state.send_replace(ConnectionState::Failed { room_id, error });
}

fn classify_callback(
    event_type: &'static str,
    self_uid: Option<String>,
    events: EventSender,
    stopping: Arc<AtomicBool>,
) -> EventCallback {
    Arc::new(move |raw: Value| {
        if stopping.load(Ordering::SeqCst) {
            return;
        }
        match event_parser::classify(event_type, &raw, self_uid.as_deref()) {
            Ok(event) => {
                debug!(kind = event.kind(), "收到事件");
                if events.send(event).is_err() {
                    debug!("事件接收端已关闭");
                }
            }
            Err(e) => warn!(event_type, error = %e, "丢弃无法解析的消息"),
        }
    })
}

fn verified_callback(
    room_id: RoomId,
    state: Arc<watch::Sender<ConnectionState>>,
    stopping: Arc<AtomicBool>,
) -> EventCallback {
    Arc::new(move |_raw: Value| {
        if stopping.load(Ordering::SeqCst) {
            return;
        }
        let changed = state.send_if_modified(|current| match current {
            ConnectionState::Connecting { room_id: id } if *id == room_id => {
                *current = ConnectionState::Connected { room_id };
                true
            }
            _ => false,
        });
        if changed {
            info!(room_id = %room_id, "弹幕服务器已连接");
        }
    })
}
