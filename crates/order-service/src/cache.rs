//! 进程内过期缓存
//!
//! 有界 LRU + 统一 TTL 的订单视图缓存。容量与 TTL 在构造时固定；
//! 过期在读取时惰性检查并顺手淘汰，容量超限时先淘汰最久未使用的条目。
//! 内部用单把 Mutex 保护，读路径与摄取路径可以并发调用 get/add。
//! 缓存只存在于内存中，每次进程启动由预热流程重建。

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::models::OrderView;

/// 缓存能力接口
///
/// 读路径与写入路径都只依赖这个抽象；测试用 mock 替身实现同一接口。
#[cfg_attr(test, mockall::automock)]
pub trait OrderCache: Send + Sync {
    /// 按键查找。键不存在或条目已超过 TTL 返回 None；
    /// 过期条目作为本次失败查找的副作用被淘汰。
    fn get(&self, key: &str) -> Option<OrderView>;

    /// 插入或覆盖条目，重置其新近度与年龄时钟；插入本身没有失败路径。
    /// 返回 true 表示为腾出容量淘汰了最久未使用的旧条目。
    fn add(&self, key: &str, value: OrderView) -> bool;
}

/// 时钟能力，TTL 判定对其取现在时刻；测试注入手动时钟
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// 默认系统时钟
struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    view: OrderView,
    inserted_at: Instant,
}

/// 有界过期缓存
pub struct ExpiringCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
    capacity: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ExpiringCache {
    /// 创建缓存；capacity 为 0 视为 1（LRU 容量必须非零）
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    /// 注入时钟的构造入口，供 TTL 相关测试使用
    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("容量已归一化为非零"),
            )),
            capacity,
            ttl,
            clock,
        }
    }

    /// 当前逻辑条目数（含未被惰性淘汰的过期条目）
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl OrderCache for ExpiringCache {
    fn get(&self, key: &str) -> Option<OrderView> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        // peek 不刷新新近度，先判断是否过期
        let fresh = match inner.peek(key) {
            None => return None,
            Some(entry) => now.duration_since(entry.inserted_at) <= self.ttl,
        };

        if !fresh {
            inner.pop(key);
            return None;
        }

        // get 命中同时把条目提为最新
        inner.get(key).map(|entry| entry.view.clone())
    }

    fn add(&self, key: &str, value: OrderView) -> bool {
        let entry = CacheEntry {
            view: value,
            inserted_at: self.clock.now(),
        };
        let mut inner = self.inner.lock();

        // 覆盖已有键不增加逻辑大小，只有新键落在满容量上才触发淘汰
        let evicts = inner.len() == self.capacity && !inner.contains(key);
        inner.put(key.to_string(), entry);
        evicts
    }
}
