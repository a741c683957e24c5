//! 检测历史存储
//!
//! 每个URL一个定长环形缓冲区，按插入位置对容量取模寻址，超出容量时淘汰最旧的记录

use crate::health::result::CheckResult;
use std::collections::HashMap;

/// 每个URL默认保留的历史记录数
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// 单个URL的检测历史
#[derive(Debug, Clone)]
pub struct UrlHistory {
    /// 存储槽位
    slots: Vec<CheckResult>,
    /// 容量上限
    capacity: usize,
    /// 累计写入次数
    written: u64,
}

impl UrlHistory {
    /// 创建指定容量的历史记录，容量至少为1
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity.min(64)),
            capacity,
            written: 0,
        }
    }

    /// 追加一条记录
    pub fn push(&mut self, result: CheckResult) {
        if self.slots.len() < self.capacity {
            self.slots.push(result);
        } else {
            let index = (self.written % self.capacity as u64) as usize;
            self.slots[index] = result;
        }
        self.written += 1;
    }

    /// 最新的一条记录
    pub fn latest(&self) -> Option<&CheckResult> {
        if self.written == 0 {
            return None;
        }
        let index = ((self.written - 1) % self.capacity as u64) as usize;
        self.slots.get(index)
    }

    /// 按时间顺序（从旧到新）遍历
    pub fn iter(&self) -> impl Iterator<Item = &CheckResult> {
        let start = if self.slots.len() < self.capacity {
            0
        } else {
            (self.written % self.capacity as u64) as usize
        };
        self.slots[start..].iter().chain(self.slots[..start].iter())
    }

    /// 当前保留的记录数
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 容量上限
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// 按URL索引的检测历史存储
///
/// 同一URL的写入必须串行，调度器以 `&mut self` 独占持有
#[derive(Debug, Clone)]
pub struct HistoryStore {
    /// 每个URL的容量上限
    capacity: usize,
    /// URL到历史记录的映射
    histories: HashMap<String, UrlHistory>,
}

impl HistoryStore {
    /// 创建新的历史存储
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            histories: HashMap::new(),
        }
    }

    /// 追加一条检测结果，返回后该URL的记录数不超过容量
    pub fn append(&mut self, url: &str, result: CheckResult) {
        let capacity = self.capacity;
        self.histories
            .entry(url.to_string())
            .or_insert_with(|| UrlHistory::with_capacity(capacity))
            .push(result);
    }

    /// 获取最新的检测结果
    pub fn latest(&self, url: &str) -> Option<&CheckResult> {
        self.histories.get(url).and_then(UrlHistory::latest)
    }

    /// 获取全部检测结果（从旧到新）
    pub fn all(&self, url: &str) -> Vec<CheckResult> {
        self.histories
            .get(url)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 单个URL当前保留的记录数
    pub fn len(&self, url: &str) -> usize {
        self.histories.get(url).map_or(0, UrlHistory::len)
    }

    /// 每个URL的容量上限
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
