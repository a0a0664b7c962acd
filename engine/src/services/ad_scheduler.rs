//! 定时广告调度
//!
//! 每个有效广告条目对应一个独立的周期任务:
//! 先发送,再等待一个间隔。发送失败时按固定退避重试,任务不退出。
//!
//! 任务每个周期都重新读取 `is_monitoring` 与 `ad_enabled`,
//! 关闭开关后在下一次检查时自行退出,无需外部取消。

use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::settings::keys;
use crate::models::{AdEntry, ClassifiedEvent, RoomId};
use crate::services::room_connection::{EventSender, RoomConnection};
use crate::services::settings_store::SettingsProvider;

/// 一组同时启动、同时停止的广告任务
struct TaskGroup {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

pub struct AdScheduler {
    connection: Arc<RoomConnection>,
    settings: Arc<dyn SettingsProvider>,
    is_monitoring: Arc<AtomicBool>,
    failure_backoff: Duration,
    running: Mutex<Option<TaskGroup>>,
}

impl AdScheduler {
    pub fn new(
        connection: Arc<RoomConnection>,
        settings: Arc<dyn SettingsProvider>,
        is_monitoring: Arc<AtomicBool>,
        failure_backoff: Duration,
    ) -> Self {
        Self {
            connection,
            settings,
            is_monitoring,
            failure_backoff,
            running: Mutex::new(None),
        }
    }

    /// 启动广告任务
    ///
    /// 先停止上一组任务。`ad_enabled` 关闭时不启动任何任务。
    /// 已发送的广告以 `Advertisement` 事件写入 `events`。
    /// 返回启动的任务数。
    pub async fn start(&self, room_id: RoomId, events: EventSender) -> usize {
        let mut running = self.running.lock().await;
        if let Some(group) = running.take() {
            Self::shutdown(group).await;
        }

        let settings = self.settings.monitor_settings();
        if !settings.ad_enabled {
            debug!(room_id = %room_id, "定时广告未启用");
            return 0;
        }

        let cancel = CancellationToken::new();
        let handles: Vec<JoinHandle<()>> = settings
            .ad_list
            .into_iter()
            .filter(AdEntry::is_schedulable)
            .map(|entry| {
                let task = AdTask {
                    room_id,
                    text: entry.text.trim().to_string(),
                    interval: entry.interval_duration(),
                    failure_backoff: self.failure_backoff,
                    connection: self.connection.clone(),
                    settings: self.settings.clone(),
                    is_monitoring: self.is_monitoring.clone(),
                    events: events.clone(),
                };
                tokio::spawn(task.run(cancel.clone()))
            })
            .collect();

        let count = handles.len();
        info!(room_id = %room_id, tasks = count, "定时广告已启动");
        if count > 0 {
            *running = Some(TaskGroup { cancel, handles });
        }
        count
    }

    /// 停止全部广告任务,等待每个任务退出后返回
    ///
    /// 返回停止的任务数。
    pub async fn stop(&self) -> usize {
        let mut running = self.running.lock().await;
        match running.take() {
            Some(group) => {
                let count = Self::shutdown(group).await;
                info!(tasks = count, "定时广告已停止");
                count
            }
            None => 0,
        }
    }

    /// 仍在运行的任务数
    pub async fn active_tasks(&self) -> usize {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|group| group.handles.iter().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }

    async fn shutdown(group: TaskGroup) -> usize {
        group.cancel.cancel();
        let count = group.handles.len();
        for result in join_all(group.handles).await {
            if let Err(e) = result {
                warn!(error = %e, "广告任务异常退出");
            }
        }
        count
    }
}

/// 单条广告的周期任务
struct AdTask {
    room_id: RoomId,
    text: String,
    interval: Duration,
    failure_backoff: Duration,
    connection: Arc<RoomConnection>,
    settings: Arc<dyn SettingsProvider>,
    is_monitoring: Arc<AtomicBool>,
    events: EventSender,
}

impl AdTask {
    async fn run(self, cancel: CancellationToken) {
        debug!(room_id = %self.room_id, interval_secs = self.interval.as_secs(), "广告任务开始");

        loop {
            if cancel.is_cancelled() {
                break;
            }
            if !self.is_monitoring.load(Ordering::SeqCst) {
                debug!(room_id = %self.room_id, "监控已结束,广告任务退出");
                break;
            }
            if !self.settings.flag(keys::AD_ENABLED) {
                info!(room_id = %self.room_id, "定时广告已关闭,任务退出");
                break;
            }

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.connection.send_text(self.room_id, &self.text) => result,
            };

            let pause = match sent {
                Ok(()) => {
                    let _ = self.events.send(ClassifiedEvent::Advertisement {
                        text: self.text.clone(),
                    });
                    self.interval
                }
                Err(e) => {
                    warn!(
                        room_id = %self.room_id,
                        error = %e,
                        backoff_secs = self.failure_backoff.as_secs(),
                        "广告发送失败,稍后重试"
                    );
                    self.failure_backoff
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}
