//! 历史监控房间号
//!
//! 最近使用在前,去重,最多保留 `limit` 条。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, warn};

use crate::models::RoomId;
use crate::services::file_store;

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    room_ids: Vec<RoomId>,
}

pub struct RoomHistory {
    path: PathBuf,
    limit: usize,
}

impl RoomHistory {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit,
        }
    }

    /// 读取历史记录,文件损坏视为空
    pub fn load(&self) -> Vec<RoomId> {
        match file_store::load_json::<HistoryFile>(&self.path) {
            Ok(Some(file)) => file.room_ids,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "历史记录读取失败,视为空");
                Vec::new()
            }
        }
    }

    /// 记录一次使用: 移到最前并截断
    pub fn add(&self, room_id: RoomId) -> bool {
        let mut room_ids = self.load();
        room_ids.retain(|id| *id != room_id);
        room_ids.insert(0, room_id);
        room_ids.truncate(self.limit);

        match file_store::save_json(&self.path, &HistoryFile { room_ids }, false) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, room_id = %room_id, "保存历史记录失败");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: u64) -> RoomId {
        RoomId::new(id).unwrap()
    }

    #[test]
    fn test_most_recent_first_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let history = RoomHistory::new(dir.path().join("monitor_history.json"), 20);

        history.add(room(1));
        history.add(room(2));
        history.add(room(1));

        assert_eq!(history.load(), vec![room(1), room(2)]);
    }

    #[test]
    fn test_truncated_to_limit() {
        let dir = tempfile::tempdir().unwrap();
        let history = RoomHistory::new(dir.path().join("monitor_history.json"), 20);

        for id in 1..=25 {
            history.add(room(id));
        }

        let loaded = history.load();
        assert_eq!(loaded.len(), 20);
        assert_eq!(loaded[0], room(25));
        assert_eq!(loaded[19], room(6));
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor_history.json");
        std::fs::write(&path, r#"{"room_ids": [0]}"#).unwrap();

        let history = RoomHistory::new(&path, 20);
        assert!(history.load().is_empty());
        assert!(history.add(room(3)));
        assert_eq!(history.load(), vec![room(3)]);
    }
}
