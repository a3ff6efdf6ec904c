//! 订单缓存与摄取服务
//!
//! 消费 Kafka 中的订单事件，经批量校验后写入 PostgreSQL 并同步写入
//! 进程内过期缓存；读路径优先命中缓存，未命中时回源存储。
//! 对外（由外部传输层消费）的同步接口为 `OrderService::{get_by_id, create}`。

pub mod cache;
pub mod consumer;
pub mod kafka;
pub mod models;
pub mod repository;
pub mod service;
pub mod validation;
pub mod warmup;
