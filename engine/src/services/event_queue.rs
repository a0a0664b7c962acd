//! 可见性感知的事件分发
//!
//! 页面可见时事件立即交给界面;不可见时进入有界缓冲,
//! 满了丢弃最旧的一条。页面重新可见时按到达顺序一次性回放并清空。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use crate::models::ClassifiedEvent;

/// 事件接收方 (界面层)
///
/// 在队列锁内被调用,实现中不得回调 `EventQueue`。
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &ClassifiedEvent);
}

impl<F> EventSink for F
where
    F: Fn(&ClassifiedEvent) + Send + Sync,
{
    fn on_event(&self, event: &ClassifiedEvent) {
        self(event)
    }
}

struct QueueState {
    visible: bool,
    buffer: VecDeque<ClassifiedEvent>,
    /// 累计因缓冲已满而丢弃的事件数
    dropped: u64,
}

pub struct EventQueue {
    sink: Arc<dyn EventSink>,
    max_len: usize,
    state: Mutex<QueueState>,
}

impl EventQueue {
    /// 创建队列,初始为可见
    pub fn new(sink: Arc<dyn EventSink>, max_len: usize) -> Self {
        Self {
            sink,
            max_len: max_len.max(1),
            state: Mutex::new(QueueState {
                visible: true,
                buffer: VecDeque::with_capacity(max_len),
                dropped: 0,
            }),
        }
    }

    /// 分发一条事件
    ///
    /// 可见: 立即交给接收方。
    /// 不可见: 追加到缓冲,已满时先淘汰最旧的一条。生产者从不阻塞等待。
    pub fn dispatch(&self, event: ClassifiedEvent) {
        let mut state = self.lock();
        if state.visible {
            self.sink.on_event(&event);
            return;
        }

        if state.buffer.len() >= self.max_len {
            state.buffer.pop_front();
            state.dropped += 1;
        }
        debug!(kind = event.kind(), buffered = state.buffer.len() + 1, "页面不可见,事件已缓存");
        state.buffer.push_back(event);
    }

    /// 设置可见性
    ///
    /// 由不可见变为可见时按原顺序回放缓冲中的全部事件并清空。
    /// 回放与后续 `dispatch` 串行,不会重复投递也不会乱序。
    pub fn set_visible(&self, visible: bool) {
        let mut state = self.lock();
        let was_visible = state.visible;
        state.visible = visible;

        if !visible || was_visible {
            return;
        }

        let pending: Vec<ClassifiedEvent> = state.buffer.drain(..).collect();
        if pending.is_empty() {
            return;
        }
        for event in &pending {
            self.sink.on_event(event);
        }
        info!(flushed = pending.len(), dropped = state.dropped, "已刷新缓存事件");
        state.dropped = 0;
    }

    pub fn is_visible(&self) -> bool {
        self.lock().visible
    }

    pub fn buffered_len(&self) -> usize {
        self.lock().buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.max_len
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
