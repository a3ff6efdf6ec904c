//! 缓存启动预热
//!
//! 服务开始接收读与摄取流量之前执行一次：从存储取最新 limit 条订单，
//! 逐条转换为视图写入缓存。存储失败时中止并把错误交给调用方，
//! 是否以冷缓存降级启动由调用方决定。

use tracing::info;

use order_shared::error::Result;

use crate::cache::OrderCache;
use crate::repository::OrderRepository;

/// 预热缓存，返回写入的条目数
///
/// 同一存储状态下重复执行的最终缓存成员一致（幂等），
/// 仅插入顺序可能不同。
pub async fn warm_cache(
    repo: &dyn OrderRepository,
    cache: &dyn OrderCache,
    limit: i64,
) -> Result<usize> {
    let orders = repo.get_recent(limit).await?;
    let count = orders.len();

    for order in &orders {
        cache.add(&order.order_uid.to_string(), order.to_view());
    }

    info!(count, limit, "缓存预热完成");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ExpiringCache;
    use crate::models::valid_order_fixture;
    use crate::repository::MockOrderRepository;
    use order_shared::error::OrderError;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_warmup_populates_cache() {
        let mut order_a = valid_order_fixture();
        order_a.order_uid = Uuid::parse_str("b563feb7-b2b8-4b6a-9d7a-0000000000aa").unwrap();
        let mut order_b = valid_order_fixture();
        order_b.order_uid = Uuid::parse_str("b563feb7-b2b8-4b6a-9d7a-0000000000bb").unwrap();

        let key_a = order_a.order_uid.to_string();
        let key_b = order_b.order_uid.to_string();
        let expected_a = order_a.to_view();

        let mut repo = MockOrderRepository::new();
        repo.expect_get_recent()
            .withf(|limit| *limit == 10)
            .times(1)
            .returning(move |_| Ok(vec![order_a.clone(), order_b.clone()]));

        let cache = ExpiringCache::new(16, Duration::from_secs(60));
        let count = warm_cache(&repo, &cache, 10).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(cache.get(&key_a), Some(expected_a));
        assert!(cache.get(&key_b).is_some());
    }

    #[tokio::test]
    async fn test_warmup_surfaces_repository_error() {
        let mut repo = MockOrderRepository::new();
        repo.expect_get_recent()
            .times(1)
            .returning(|_| Err(OrderError::Database(sqlx::Error::PoolTimedOut)));

        let cache = ExpiringCache::new(16, Duration::from_secs(60));
        let result = warm_cache(&repo, &cache, 10).await;

        assert!(result.is_err());
        assert!(cache.is_empty());
    }
}
