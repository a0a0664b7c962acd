//! EventQueue 契约测试
//!
//! 验证可见性缓冲的三条规则:
//! - 不可见时缓冲长度永不超过容量,满后淘汰最旧的一条
//! - 恢复可见时按到达顺序回放全部缓冲并清空
//! - 可见时直接投递,不经过缓冲

use std::sync::{Arc, Mutex};

use live_monitor::models::ClassifiedEvent;
use live_monitor::services::{EventQueue, EventSink};

#[derive(Default)]
struct Collector(Mutex<Vec<ClassifiedEvent>>);

impl Collector {
    fn texts(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|event| match event {
                ClassifiedEvent::Danmaku { text, .. } => text.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}

impl EventSink for Collector {
    fn on_event(&self, event: &ClassifiedEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

fn danmaku(n: usize) -> ClassifiedEvent {
    ClassifiedEvent::Danmaku {
        username: "viewer".to_string(),
        user_id: n.to_string(),
        text: format!("#{}", n),
        is_self: false,
    }
}

fn hidden_queue() -> (Arc<Collector>, EventQueue) {
    let sink = Arc::new(Collector::default());
    let queue = EventQueue::new(sink.clone(), 50);
    queue.set_visible(false);
    (sink, queue)
}

#[test]
fn test_buffer_never_exceeds_capacity() {
    let (sink, queue) = hidden_queue();

    for n in 0..200 {
        queue.dispatch(danmaku(n));
        assert!(queue.buffered_len() <= 50);
    }
    assert_eq!(queue.buffered_len(), 50);
    assert!(sink.texts().is_empty());
}

#[test]
fn test_51st_event_evicts_oldest() {
    let (sink, queue) = hidden_queue();

    for n in 0..51 {
        queue.dispatch(danmaku(n));
    }
    queue.set_visible(true);

    let texts = sink.texts();
    assert_eq!(texts.len(), 50);
    assert_eq!(texts.first().map(String::as_str), Some("#1"));
    assert_eq!(texts.last().map(String::as_str), Some("#50"));
}

#[test]
fn test_flush_preserves_order_then_clears() {
    for count in [0usize, 1, 17, 50] {
        let (sink, queue) = hidden_queue();
        for n in 0..count {
            queue.dispatch(danmaku(n));
        }

        queue.set_visible(true);

        let expected: Vec<String> = (0..count).map(|n| format!("#{}", n)).collect();
        assert_eq!(sink.texts(), expected);
        assert_eq!(queue.buffered_len(), 0);

        // 重复设置为可见不会再次投递
        queue.set_visible(true);
        assert_eq!(sink.texts().len(), count);
    }
}

#[test]
fn test_visible_dispatch_bypasses_buffer() {
    let sink = Arc::new(Collector::default());
    let queue = EventQueue::new(sink.clone(), 50);
    assert!(queue.is_visible());

    queue.dispatch(danmaku(1));
    queue.dispatch(ClassifiedEvent::Advertisement {
        text: "关注主播".to_string(),
    });

    assert_eq!(sink.texts(), vec!["#1", "[广告] 关注主播"]);
    assert_eq!(queue.buffered_len(), 0);
}

#[test]
fn test_hide_again_after_flush() {
    let (sink, queue) = hidden_queue();
    queue.dispatch(danmaku(0));
    queue.set_visible(true);

    queue.set_visible(false);
    queue.dispatch(danmaku(1));
    assert_eq!(sink.texts(), vec!["#0"]);

    queue.set_visible(true);
    assert_eq!(sink.texts(), vec!["#0", "#1"]);
}
