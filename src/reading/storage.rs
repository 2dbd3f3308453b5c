//! 阅读设置存储模块
//!
//! 键值形式保存阅读偏好，并支持按键注册变更监听。
//! 通知在释放内部借用之后派发，监听回调里可以安全地
//! 读写存储本身。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

// ====== 类型定义 ======

/// 设置变更回调，参数为新值与旧值
pub type WatchCallback = Box<dyn FnMut(Option<&str>, Option<&str>)>;

/// 存储统计信息
#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    pub reads: usize,
    pub writes: usize,
    pub hits: usize,
    pub misses: usize,
    pub watchers_registered: usize,
    pub notifications: usize,
}

impl StorageStats {
    /// 读取命中率
    pub fn hit_rate(&self) -> f64 {
        if self.reads == 0 {
            0.0
        } else {
            self.hits as f64 / self.reads as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

struct StoreInner {
    entries: HashMap<String, String>,
    watchers: HashMap<String, Vec<WatchCallback>>,
    stats: StorageStats,
}

/// 设置存储
///
/// 克隆共享同一份底层数据，方便控制器与回调各持一份句柄。
#[derive(Clone)]
pub struct SettingsStore {
    inner: Rc<RefCell<StoreInner>>,
}

// ====== 核心实现 ======

impl SettingsStore {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                entries: HashMap::new(),
                watchers: HashMap::new(),
                stats: StorageStats::default(),
            })),
        }
    }

    /// 读取键值
    pub fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        inner.stats.reads += 1;
        match inner.entries.get(key) {
            Some(value) => {
                inner.stats.hits += 1;
                Some(value.clone())
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// 写入键值，返回旧值
    ///
    /// 值未发生变化时不触发监听。
    pub fn set(&self, key: &str, value: &str) -> Option<String> {
        let previous = {
            let mut inner = self.inner.borrow_mut();
            inner.stats.writes += 1;
            inner.entries.insert(key.to_string(), value.to_string())
        };

        if previous.as_deref() == Some(value) {
            return previous;
        }

        debug!("设置已更新: {} = {}", key, value);
        self.notify_watchers(key, previous.as_deref(), Some(value));
        previous
    }

    /// 删除键值，返回被删除的值
    pub fn remove(&self, key: &str) -> Option<String> {
        let previous = {
            let mut inner = self.inner.borrow_mut();
            let previous = inner.entries.remove(key);
            if previous.is_some() {
                inner.stats.writes += 1;
            }
            previous
        };

        if let Some(ref old) = previous {
            debug!("设置已删除: {}", key);
            self.notify_watchers(key, Some(old), None);
        }
        previous
    }

    /// 注册指定键的变更监听
    ///
    /// 回调收到 `(新值, 旧值)`，删除时新值为 `None`。
    pub fn watch<F>(&self, key: &str, callback: F)
    where
        F: FnMut(Option<&str>, Option<&str>) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        inner
            .watchers
            .entry(key.to_string())
            .or_default()
            .push(Box::new(callback));
        inner.stats.watchers_registered += 1;
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().entries.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// 指定键当前注册的监听数量
    pub fn watcher_count(&self, key: &str) -> usize {
        self.inner
            .borrow()
            .watchers
            .get(key)
            .map_or(0, |list| list.len())
    }

    pub fn stats(&self) -> StorageStats {
        self.inner.borrow().stats.clone()
    }

    pub fn reset_stats(&self) {
        self.inner.borrow_mut().stats.reset();
    }

    /// 派发变更通知
    ///
    /// 回调列表先从表中取出再调用，期间不持有内部借用。
    /// 回调里对同一键的再次写入不会递归触发本轮监听，
    /// 回调里新注册的监听会在派发结束后合并回列表。
    fn notify_watchers(&self, key: &str, old: Option<&str>, new: Option<&str>) {
        let mut callbacks = {
            let mut inner = self.inner.borrow_mut();
            match inner.watchers.remove(key) {
                Some(list) => list,
                None => return,
            }
        };

        for callback in callbacks.iter_mut() {
            callback(new, old);
        }

        let mut inner = self.inner.borrow_mut();
        inner.stats.notifications += callbacks.len();
        if let Some(mut added) = inner.watchers.remove(key) {
            callbacks.append(&mut added);
        }
        inner.watchers.insert(key.to_string(), callbacks);
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}
