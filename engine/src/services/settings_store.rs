//! 设置存储
//!
//! 以键值表形式提供 get/set/get_all,并持久化到 JSON 文件。
//! 定时广告任务每个周期都会重新读取 `ad_enabled`,
//! 因此写入立即对运行中的任务可见。

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use tracing::{error, info, warn};

use crate::models::settings::keys;
use crate::models::{AdEntry, MonitorSettings};
use crate::services::file_store;

/// 设置提供方
pub trait SettingsProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    /// 写入单个键并持久化,失败返回 false
    fn set(&self, key: &str, value: Value) -> bool;

    /// 批量写入并持久化
    fn update(&self, values: Map<String, Value>) -> bool;

    fn get_all(&self) -> Map<String, Value>;

    /// 类型化的监控设置快照
    fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings::from_map(&self.get_all())
    }

    /// 读取布尔开关,缺失或类型不符视为 false
    fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }
}

/// 基于 JSON 文件的设置存储
pub struct JsonSettingsStore {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl JsonSettingsStore {
    /// 打开设置文件
    ///
    /// 文件不存在或格式损坏时以空设置启动。
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match file_store::load_json::<Map<String, Value>>(&path) {
            Ok(Some(values)) => values,
            Ok(None) => {
                info!(path = %path.display(), "设置文件不存在,使用默认设置");
                Map::new()
            }
            Err(e) => {
                warn!(error = %e, "设置文件读取失败,使用默认设置");
                Map::new()
            }
        };

        Self {
            path,
            values: RwLock::new(values),
        }
    }

    fn persist(&self, values: &Map<String, Value>) -> bool {
        match file_store::save_json(&self.path, values, true) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "保存设置失败");
                false
            }
        }
    }
}

impl SettingsProvider for JsonSettingsStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Value) -> bool {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
        self.persist(&values)
    }

    fn update(&self, updates: Map<String, Value>) -> bool {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.extend(updates);
        self.persist(&values)
    }

    fn get_all(&self) -> Map<String, Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// 广告列表最多保留的行数
pub const MAX_AD_ROWS: usize = 100;

/// 广告列表编辑
///
/// 按下标寻址,与持久化数组的每一行一一对应。
/// 无法解析的行原样保留,不参与调度。
pub struct AdListEditor<'a> {
    settings: &'a dyn SettingsProvider,
}

impl<'a> AdListEditor<'a> {
    pub fn new(settings: &'a dyn SettingsProvider) -> Self {
        Self { settings }
    }

    /// 每一行的解析结果,无法解析的行为 None
    pub fn entries(&self) -> Vec<Option<AdEntry>> {
        self.rows()
            .iter()
            .map(|row| AdEntry::deserialize(row).ok())
            .collect()
    }

    /// 追加一条默认条目 (5分钟,空文案),返回其下标
    pub fn add(&self) -> Option<usize> {
        let mut rows = self.rows();
        if rows.len() >= MAX_AD_ROWS {
            warn!(rows = rows.len(), "广告列表已满");
            return None;
        }
        rows.push(default_row()?);
        let index = rows.len() - 1;
        self.store(rows).then_some(index)
    }

    /// 覆盖指定下标,列表不够长时用默认条目补齐
    ///
    /// 下标不小于 `MAX_AD_ROWS` 时不做任何修改。
    pub fn save(&self, index: usize, entry: AdEntry) -> bool {
        if index >= MAX_AD_ROWS {
            warn!(index, "广告条目下标越界");
            return false;
        }
        let (Some(filler), Some(row)) = (default_row(), to_row(&entry)) else {
            return false;
        };

        let mut rows = self.rows();
        if rows.len() <= index {
            rows.resize(index + 1, filler);
        }
        rows[index] = row;
        self.store(rows)
    }

    /// 删除指定下标,越界时不做任何修改
    pub fn remove(&self, index: usize) -> bool {
        let mut rows = self.rows();
        if index >= rows.len() {
            return false;
        }
        rows.remove(index);
        self.store(rows)
    }

    fn rows(&self) -> Vec<Value> {
        match self.settings.get(keys::AD_LIST) {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        }
    }

    fn store(&self, rows: Vec<Value>) -> bool {
        self.settings.set(keys::AD_LIST, Value::Array(rows))
    }
}

fn to_row(entry: &AdEntry) -> Option<Value> {
    serde_json::to_value(entry)
        .map_err(|e| error!(error = %e, "广告条目序列化失败"))
        .ok()
}

fn default_row() -> Option<Value> {
    to_row(&AdEntry::default())
}
