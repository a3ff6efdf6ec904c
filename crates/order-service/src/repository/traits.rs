//! 仓储 Trait 定义
//!
//! 服务层依赖抽象而非具体实现，测试用 mock 替身

use async_trait::async_trait;
use uuid::Uuid;

use order_shared::error::Result;

use crate::models::Order;

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 按标识符取单；不存在返回 None
    async fn get_by_uid(&self, uid: Uuid) -> Result<Option<Order>>;

    /// 按创建时间倒序取最新 limit 条，供启动预热使用
    async fn get_recent(&self, limit: i64) -> Result<Vec<Order>>;

    /// 插入订单；标识符已存在返回 `OrderError::AlreadyExists`
    async fn create(&self, order: &Order) -> Result<()>;
}
