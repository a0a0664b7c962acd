//! 测试公共模块
//!
//! 内存实现的直播平台、记录型事件接收方与内存设置,
//! 集成测试不依赖真实网络。

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use live_monitor::models::{
    ChallengeStatus, ClassifiedEvent, Credential, LoginChallenge, PlatformError, PlayInfo, RoomId,
    RoomMetadata, UserProfile,
};
use live_monitor::services::platform::EVENT_VERIFIED;
use live_monitor::services::{EventCallback, EventSink, EventStream, LivePlatform, SettingsProvider};

pub fn room(id: u64) -> RoomId {
    RoomId::new(id).unwrap()
}

pub fn test_credential() -> Credential {
    Credential::new(
        "sessdata-test".to_string(),
        "csrf-test".to_string(),
        "10086".to_string(),
    )
}

/// 让出执行权若干次,使已就绪的后台任务跑完
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// 单个弹幕流的控制端
///
/// 测试通过它注入原始消息、确认连接或模拟服务器断开。
pub struct StreamControl {
    pub room_id: RoomId,
    pub logged_in: bool,
    callbacks: Mutex<HashMap<String, Vec<EventCallback>>>,
    connect_error: Mutex<Option<PlatformError>>,
    closed: CancellationToken,
    disconnected: AtomicBool,
}

impl StreamControl {
    /// 按事件类型推送一条原始消息
    pub fn emit(&self, event_type: &str, raw: Value) {
        let callbacks = self
            .callbacks
            .lock()
            .unwrap()
            .get(event_type)
            .cloned()
            .unwrap_or_default();
        for callback in callbacks {
            callback(raw.clone());
        }
    }

    pub fn emit_danmaku(&self, uid: u64, username: &str, text: &str) {
        self.emit(
            "DANMU_MSG",
            json!({
                "type": "DANMU_MSG",
                "data": {"cmd": "DANMU_MSG", "info": [[0, 1, 25], text, [uid, username, 0]]}
            }),
        );
    }

    pub fn emit_gift(&self, username: &str, gift_name: &str, num: u64) {
        self.emit(
            "SEND_GIFT",
            json!({
                "type": "SEND_GIFT",
                "data": {"cmd": "SEND_GIFT", "data": {"uname": username, "giftName": gift_name, "num": num}}
            }),
        );
    }

    /// 服务器确认连接
    pub fn acknowledge(&self) {
        self.emit(EVENT_VERIFIED, json!({"type": EVENT_VERIFIED}));
    }

    /// 服务器主动关闭连接
    pub fn end(&self) {
        self.closed.cancel();
    }

    /// 是否经由 disconnect 关闭
    pub fn was_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.callbacks.lock().unwrap().keys().cloned().collect();
        types.sort();
        types
    }
}

struct MockStream {
    control: Arc<StreamControl>,
}

#[async_trait]
impl EventStream for MockStream {
    fn register(&mut self, event_type: &str, callback: EventCallback) {
        self.control
            .callbacks
            .lock()
            .unwrap()
            .entry(event_type.to_string())
            .or_default()
            .push(callback);
    }

    async fn connect(&self) -> Result<(), PlatformError> {
        let error = self.control.connect_error.lock().unwrap().take();
        if let Some(error) = error {
            return Err(error);
        }
        self.control.closed.cancelled().await;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PlatformError> {
        self.control.disconnected.store(true, Ordering::SeqCst);
        self.control.closed.cancel();
        Ok(())
    }
}

#[derive(Default)]
struct MockState {
    sent: Vec<(RoomId, String)>,
    send_attempts: usize,
    fail_send: bool,
    send_delay: Option<Duration>,
    fail_open: bool,
    fail_connect: bool,
    fail_room_info: bool,
    fail_poll: bool,
    streams: Vec<Arc<StreamControl>>,
    challenge_script: VecDeque<ChallengeStatus>,
    poll_count: usize,
}

/// 内存直播平台
#[derive(Default)]
pub struct MockPlatform {
    state: Mutex<MockState>,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.state.lock().unwrap().fail_send = fail;
    }

    /// 之后每次发送弹幕前先等待 `delay`
    pub fn set_send_delay(&self, delay: Duration) {
        self.state.lock().unwrap().send_delay = Some(delay);
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().unwrap().fail_open = fail;
    }

    /// 之后打开的弹幕流在 connect 时立即失败
    pub fn set_fail_connect(&self, fail: bool) {
        self.state.lock().unwrap().fail_connect = fail;
    }

    pub fn set_fail_room_info(&self, fail: bool) {
        self.state.lock().unwrap().fail_room_info = fail;
    }

    pub fn set_fail_poll(&self, fail: bool) {
        self.state.lock().unwrap().fail_poll = fail;
    }

    /// 依次返回的二维码状态,用完后一直返回 Pending
    pub fn script_challenge(&self, statuses: Vec<ChallengeStatus>) {
        self.state.lock().unwrap().challenge_script = statuses.into();
    }

    pub fn poll_count(&self) -> usize {
        self.state.lock().unwrap().poll_count
    }

    pub fn sent(&self) -> Vec<(RoomId, String)> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_to(&self, room_id: RoomId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(id, _)| *id == room_id)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn send_attempts(&self) -> usize {
        self.state.lock().unwrap().send_attempts
    }

    pub fn streams(&self) -> Vec<Arc<StreamControl>> {
        self.state.lock().unwrap().streams.clone()
    }

    pub fn latest_stream(&self) -> Arc<StreamControl> {
        self.streams().last().cloned().expect("no stream opened")
    }
}

#[async_trait]
impl LivePlatform for MockPlatform {
    async fn generate_login_challenge(&self) -> Result<LoginChallenge, PlatformError> {
        Ok(LoginChallenge::new(
            "qrcode-key-1".to_string(),
            "https://passport.example/qrcode?key=1".to_string(),
            180,
        ))
    }

    async fn poll_challenge(
        &self,
        _challenge: &LoginChallenge,
    ) -> Result<ChallengeStatus, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.poll_count += 1;
        if state.fail_poll {
            return Err(PlatformError::NetworkFailed("connection reset".to_string()));
        }
        Ok(state
            .challenge_script
            .pop_front()
            .unwrap_or(ChallengeStatus::Pending))
    }

    async fn resolve_credential(
        &self,
        _challenge: &LoginChallenge,
    ) -> Result<Credential, PlatformError> {
        Ok(test_credential().with_refresh_value("refresh-test".to_string()))
    }

    async fn get_self_info(&self, credential: &Credential) -> Result<UserProfile, PlatformError> {
        Ok(UserProfile {
            uid: credential.user_id.parse().unwrap_or_default(),
            name: "测试用户".to_string(),
            avatar_url: "https://i0.example/face.jpg".to_string(),
        })
    }

    async fn get_room_info(&self, room_id: RoomId) -> Result<RoomMetadata, PlatformError> {
        if self.state.lock().unwrap().fail_room_info {
            return Err(PlatformError::Rejected {
                code: -400,
                message: "房间不存在".to_string(),
            });
        }
        Ok(RoomMetadata {
            title: format!("测试直播间 {}", room_id),
            anchor_name: "主播".to_string(),
            live_status: 1,
            cover_url: String::new(),
        })
    }

    async fn get_room_play_info(&self, _room_id: RoomId) -> Result<PlayInfo, PlatformError> {
        Ok(PlayInfo { online: 1234 })
    }

    async fn open_event_stream(
        &self,
        room_id: RoomId,
        credential: Option<&Credential>,
    ) -> Result<Box<dyn EventStream>, PlatformError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_open {
            return Err(PlatformError::NetworkFailed("无法连接到服务器".to_string()));
        }

        let connect_error = state
            .fail_connect
            .then(|| PlatformError::NetworkFailed("handshake failed".to_string()));
        let control = Arc::new(StreamControl {
            room_id,
            logged_in: credential.is_some(),
            callbacks: Mutex::new(HashMap::new()),
            connect_error: Mutex::new(connect_error),
            closed: CancellationToken::new(),
            disconnected: AtomicBool::new(false),
        });
        state.streams.push(control.clone());
        Ok(Box::new(MockStream { control }))
    }

    async fn send_message(
        &self,
        room_id: RoomId,
        _credential: &Credential,
        text: &str,
    ) -> Result<(), PlatformError> {
        let delay = self.state.lock().unwrap().send_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.send_attempts += 1;
        if state.fail_send {
            return Err(PlatformError::Rejected {
                code: 10031,
                message: "发送频率过快".to_string(),
            });
        }
        state.sent.push((room_id, text.to_string()));
        Ok(())
    }
}

/// 记录所有分发到界面的事件
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ClassifiedEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ClassifiedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &ClassifiedEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// 内存设置
#[derive(Default)]
pub struct MemorySettings {
    values: RwLock<Map<String, Value>>,
}

impl MemorySettings {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with(self: Arc<Self>, key: &str, value: Value) -> Arc<Self> {
        self.set(key, value);
        self
    }
}

impl SettingsProvider for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> bool {
        self.values.write().unwrap().insert(key.to_string(), value);
        true
    }

    fn update(&self, values: Map<String, Value>) -> bool {
        self.values.write().unwrap().extend(values);
        true
    }

    fn get_all(&self) -> Map<String, Value> {
        self.values.read().unwrap().clone()
    }
}
