//! 订单服务编排
//!
//! 位于缓存与仓储之间的无状态编排层：读路径先查缓存（命中即信任，
//! 最长 TTL 时长），未命中回源存储；写入路径校验 -> 落库 -> 写穿缓存。
//! 本层不持有锁，两条路径的并发安全由缓存内部保证。

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use order_shared::error::{OrderError, Result};

use crate::cache::OrderCache;
use crate::models::{Order, OrderView};
use crate::repository::OrderRepository;
use crate::validation::validate_order;

/// 订单服务
pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    cache: Arc<dyn OrderCache>,
    /// 读未命中时是否回填缓存。默认关闭：缓存只由摄取路径填充，
    /// 防止一次性查询无界撑大缓存；按需在配置中开启。
    promote_on_miss: bool,
}

impl OrderService {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        cache: Arc<dyn OrderCache>,
        promote_on_miss: bool,
    ) -> Self {
        Self {
            repo,
            cache,
            promote_on_miss,
        }
    }

    /// 按标识符查询订单视图
    ///
    /// 缓存命中直接返回，不触达存储；未命中回源，
    /// 两边都没有时返回 NotFound，缓存保持不变。
    pub async fn get_by_id(&self, uid: Uuid) -> Result<OrderView> {
        let key = uid.to_string();

        if let Some(view) = self.cache.get(&key) {
            debug!(%uid, "缓存命中");
            return Ok(view);
        }

        let order = self
            .repo
            .get_by_uid(uid)
            .await?
            .ok_or(OrderError::NotFound { id: key.clone() })?;

        let view = order.to_view();
        if self.promote_on_miss {
            self.cache.add(&key, view.clone());
        }
        Ok(view)
    }

    /// 校验并持久化订单，成功后写穿缓存
    ///
    /// 校验失败不触达存储与缓存；落库失败（含重复标识符）不写缓存。
    /// 缓存写入没有失败路径，因此本操作的成败完全由落库决定。
    pub async fn create(&self, order: &Order) -> Result<()> {
        validate_order(order)?;
        self.repo.create(order).await?;
        self.cache.add(&order.order_uid.to_string(), order.to_view());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MockOrderCache;
    use crate::models::valid_order_fixture;
    use crate::repository::MockOrderRepository;

    fn service_with(
        repo: MockOrderRepository,
        cache: MockOrderCache,
        promote_on_miss: bool,
    ) -> OrderService {
        OrderService::new(Arc::new(repo), Arc::new(cache), promote_on_miss)
    }

    #[tokio::test]
    async fn test_get_by_id_cache_hit_skips_repository() {
        let order = valid_order_fixture();
        let uid = order.order_uid;
        let view = order.to_view();

        let mut repo = MockOrderRepository::new();
        repo.expect_get_by_uid().times(0);

        let mut cache = MockOrderCache::new();
        let cached = view.clone();
        cache
            .expect_get()
            .withf(move |key| key == uid.to_string())
            .times(1)
            .returning(move |_| Some(cached.clone()));
        cache.expect_add().times(0);

        let service = service_with(repo, cache, false);
        let result = service.get_by_id(uid).await.unwrap();
        assert_eq!(result, view);
    }

    #[tokio::test]
    async fn test_get_by_id_miss_falls_back_to_repository_without_promotion() {
        let order = valid_order_fixture();
        let uid = order.order_uid;
        let view = order.to_view();

        let mut cache = MockOrderCache::new();
        cache.expect_get().times(1).returning(|_| None);
        // 默认策略：读未命中不回填
        cache.expect_add().times(0);

        let mut repo = MockOrderRepository::new();
        let found = order.clone();
        repo.expect_get_by_uid()
            .withf(move |candidate| *candidate == uid)
            .times(1)
            .returning(move |_| Ok(Some(found.clone())));

        let service = service_with(repo, cache, false);
        let result = service.get_by_id(uid).await.unwrap();
        assert_eq!(result, view);
    }

    #[tokio::test]
    async fn test_get_by_id_miss_promotes_when_configured() {
        let order = valid_order_fixture();
        let uid = order.order_uid;

        let mut cache = MockOrderCache::new();
        cache.expect_get().times(1).returning(|_| None);
        cache
            .expect_add()
            .withf(move |key, _| key == uid.to_string())
            .times(1)
            .returning(|_, _| false);

        let mut repo = MockOrderRepository::new();
        let found = order.clone();
        repo.expect_get_by_uid()
            .times(1)
            .returning(move |_| Ok(Some(found.clone())));

        let service = service_with(repo, cache, true);
        service.get_by_id(uid).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_leaves_cache_untouched() {
        let uid = valid_order_fixture().order_uid;

        let mut cache = MockOrderCache::new();
        cache.expect_get().times(1).returning(|_| None);
        cache.expect_add().times(0);

        let mut repo = MockOrderRepository::new();
        repo.expect_get_by_uid().times(1).returning(|_| Ok(None));

        let service = service_with(repo, cache, true);
        let err = service.get_by_id(uid).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_create_invalid_order_touches_nothing() {
        let mut order = valid_order_fixture();
        order.order_uid = Uuid::nil();

        let mut repo = MockOrderRepository::new();
        repo.expect_create().times(0);

        let mut cache = MockOrderCache::new();
        cache.expect_add().times(0);

        let service = service_with(repo, cache, false);
        let err = service.create(&order).await.unwrap_err();

        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("order_uid: required"));
    }

    #[tokio::test]
    async fn test_create_persists_then_caches() {
        let order = valid_order_fixture();
        let uid = order.order_uid;
        let expected = order.to_view();

        let mut repo = MockOrderRepository::new();
        repo.expect_create()
            .withf(move |candidate| candidate.order_uid == uid)
            .times(1)
            .returning(|_| Ok(()));

        let mut cache = MockOrderCache::new();
        cache
            .expect_add()
            .withf(move |key, view| key == uid.to_string() && *view == expected)
            .times(1)
            .returning(|_, _| false);

        let service = service_with(repo, cache, false);
        service.create(&order).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_duplicate_does_not_touch_cache() {
        let order = valid_order_fixture();
        let uid = order.order_uid;

        let mut repo = MockOrderRepository::new();
        repo.expect_create().times(1).returning(move |_| {
            Err(OrderError::AlreadyExists {
                id: uid.to_string(),
            })
        });

        let mut cache = MockOrderCache::new();
        cache.expect_add().times(0);

        let service = service_with(repo, cache, false);
        let err = service.create(&order).await.unwrap_err();
        assert_eq!(err.code(), "ALREADY_EXISTS");
    }
}
