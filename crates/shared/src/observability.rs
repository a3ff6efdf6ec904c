//! 日志初始化模块
//!
//! 基于 tracing-subscriber 初始化结构化日志。生产环境输出 json
//! 便于日志采集，本地开发输出 pretty 便于阅读。
//! RUST_LOG 环境变量优先于配置文件中的 log_level。

use crate::config::ObservabilityConfig;
use crate::error::{OrderError, Result};
use tracing_subscriber::EnvFilter;

/// 初始化全局日志订阅器
///
/// 只能调用一次；重复初始化返回错误而非 panic，便于测试中容错。
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let result = match config.log_format.as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    result.map_err(|e| OrderError::Internal(format!("日志初始化失败: {e}")))
}
