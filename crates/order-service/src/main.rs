//! 订单服务入口
//!
//! 启动顺序：配置 -> 日志 -> 数据库与迁移 -> 仓储/缓存 -> 缓存预热 ->
//! 订单服务 -> Kafka 摄取消费者。之后阻塞等待关闭信号，
//! 收到后通知消费者排空（提交位点并关闭连接），最后关闭数据库连接池。

use anyhow::Result;
use order_shared::{config::AppConfig, database::Database, observability, retry::RetryPolicy};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use order_service::{
    cache::ExpiringCache, consumer::IngestConsumer, kafka::KafkaSource,
    repository::PgOrderRepository, service::OrderService, warmup,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 统一加载配置：config/default.toml + 环境文件 + ORDER_ 环境变量
    let config = AppConfig::load("order-service").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        AppConfig::default()
    });

    // 2. 初始化日志
    observability::init(&config.observability)?;
    info!("Starting order-service...");
    info!(environment = %config.environment, "Configuration loaded");

    // 3. 初始化数据库连接并执行迁移
    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;
    info!("Database connection established");

    // 4. 创建仓储与缓存
    let repo = Arc::new(PgOrderRepository::new(db.pool().clone()));
    let cache = Arc::new(ExpiringCache::new(
        config.cache.capacity,
        config.cache.ttl(),
    ));

    // 5. 缓存预热：失败不阻止启动，以冷缓存降级
    match warmup::warm_cache(repo.as_ref(), cache.as_ref(), config.cache.warmup_limit).await {
        Ok(count) => info!(count, "Cache warmed up"),
        Err(e) => warn!(error = %e, "缓存预热失败，以冷缓存启动"),
    }

    // 6. 创建订单服务
    let service = Arc::new(OrderService::new(
        repo,
        cache,
        config.cache.promote_on_miss,
    ));
    info!("Order service initialized");

    // 7. 启动摄取消费者
    let source = KafkaSource::new(&config.kafka)?;
    let commit_policy =
        RetryPolicy::for_offset_commit(config.kafka.commit_retries, config.kafka.commit_backoff());
    let consumer = IngestConsumer::new(source, service, commit_policy);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_handle = tokio::spawn(consumer.run(shutdown_rx));
    info!("Ingest consumer started");

    // 8. 阻塞等待关闭信号，随后排空消费者
    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    // 排空失败只记日志：位点未提交意味着重启后消息重投，而非数据丢失
    match consumer_handle.await {
        Ok(Ok(())) => info!("Consumer drained, offsets committed"),
        Ok(Err(e)) => error!(error = %e, "消费者排空失败，未提交的消息将在重启后重投"),
        Err(e) => error!(error = %e, "消费者任务异常退出"),
    }

    db.close().await;
    info!("Service shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听 Ctrl+C 和 SIGTERM 信号，用于 Kubernetes 优雅关闭
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
