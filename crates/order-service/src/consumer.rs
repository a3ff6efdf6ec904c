//! 订单摄取消费者
//!
//! 在独立任务上持续拉取订单事件：反序列化 -> 批量校验 -> 落库 -> 写穿缓存。
//! 生命周期 运行 -> 排空 -> 停止：
//! - 运行：阻塞等待下一条消息，每轮循环检查一次取消信号；
//!   反序列化失败的消息记日志后丢弃（不重投），创建失败记日志后继续。
//! - 排空：带退避重试地提交消费位点，之后无论提交成败都关闭连接。
//! - 停止：`run` 消费 self，组件不可重启，只能重建。
//!
//! 位点不做逐条提交，崩溃（非优雅停止）时未提交的消息会被重投：
//! 系统保证至少一次处理，重复标识符由落库的唯一约束裁决为普通冲突错误。

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use order_shared::error::Result;
use order_shared::retry::{RetryPolicy, retry_with_policy};

use crate::kafka::MessageSource;
use crate::models::Order;
use crate::service::OrderService;

/// 订单摄取消费者
pub struct IngestConsumer<S: MessageSource> {
    source: S,
    service: Arc<OrderService>,
    commit_policy: RetryPolicy,
}

impl<S: MessageSource> IngestConsumer<S> {
    pub fn new(source: S, service: Arc<OrderService>, commit_policy: RetryPolicy) -> Self {
        Self {
            source,
            service,
            commit_policy,
        }
    }

    /// 启动消费循环，直到收到关闭信号后排空并停止
    ///
    /// 返回值是排空阶段位点提交的最终结果，仅供调用方记录；
    /// 取消是协作式的，不会打断进行中的消息处理。
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("订单摄取消费者已启动");

        loop {
            tokio::select! {
                // 偏向关闭信号，保证能尽快进入排空
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("收到关闭信号，进入排空阶段");
                        break;
                    }
                }

                fetched = self.source.fetch() => {
                    match fetched {
                        Ok(payload) => handle_payload(&self.service, &payload).await,
                        // 拉取失败只记日志，循环继续
                        Err(e) => error!(error = %e, "接收消息出错"),
                    }
                }
            }
        }

        self.drain().await
    }

    /// 排空：提交位点（带退避重试），随后无条件关闭连接
    async fn drain(self) -> Result<()> {
        let source = &self.source;
        let commit_result = retry_with_policy(
            &self.commit_policy,
            "commit_offset",
            |e| e.is_retryable(),
            || source.commit(),
        )
        .await;

        match &commit_result {
            Ok(()) => info!("消费位点已提交"),
            Err(e) => error!(
                error = %e,
                "位点提交最终失败，未提交的消息将在重启后重投"
            ),
        }

        if let Err(e) = self.source.close().await {
            warn!(error = %e, "关闭消息来源失败");
        }

        info!("订单摄取消费者已停止");
        commit_result
    }
}

/// 处理一条原始负载
///
/// 拆成独立函数便于测试直接调用而无需构造完整消费者。
/// 两类失败都不会中断消费循环：
/// - 反序列化失败：显式的数据质量取舍，坏消息不重投、直接丢弃；
/// - 创建失败（校验 / 落库）：记日志后该消息视为已处理。
pub async fn handle_payload(service: &OrderService, payload: &[u8]) {
    let order: Order = match serde_json::from_slice(payload) {
        Ok(order) => order,
        Err(e) => {
            warn!(error = %e, bytes = payload.len(), "消息反序列化失败，丢弃该消息");
            return;
        }
    };

    info!(order_uid = %order.order_uid, "收到订单事件");

    if let Err(e) = service.create(&order).await {
        error!(
            order_uid = %order.order_uid,
            code = e.code(),
            error = %e,
            "订单创建失败，消息视为已处理"
        );
    }
}
