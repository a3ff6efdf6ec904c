//! 共享库
//!
//! 包含订单服务各层共用的配置、错误处理、数据库连接、日志初始化与重试策略。

pub mod config;
pub mod database;
pub mod error;
pub mod observability;
pub mod retry;
