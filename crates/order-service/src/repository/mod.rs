//! 订单仓储
//!
//! 对持久存储的窄接口：按键取单、取最新 N 条、不存在才插入。

mod order_repo;
mod traits;

pub use order_repo::PgOrderRepository;
pub use traits::OrderRepository;

#[cfg(test)]
pub use traits::MockOrderRepository;
