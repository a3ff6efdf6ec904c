//! 重试策略与执行器
//!
//! 提供指数退避重试，用于瞬时故障（网络抖动、broker 短暂不可用等）的自动恢复。
//! 当前唯一的重试场景是消费者关闭阶段的偏移量提交；业务错误不进入重试，
//! 由调用方通过 `is_retryable` 闭包控制。
//!
//! 已知限制：退避期间的 sleep 不响应取消信号，最坏情况下关闭耗时会
//! 多出一个完整退避周期。

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::OrderError;

/// 重试策略配置
///
/// 首次失败后等待 `initial_backoff`，之后每轮乘以 `multiplier`，
/// 直到到达 `max_backoff` 或用尽 `max_retries`。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大重试次数（不含首次执行）
    pub max_retries: u32,
    /// 首次重试前的等待时间
    pub initial_backoff: Duration,
    /// 退避时间上限
    pub max_backoff: Duration,
    /// 每次重试的退避倍数
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 按消费者配置构造偏移量提交的重试策略（退避逐轮翻倍）
    pub fn for_offset_commit(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            ..Self::default()
        }
    }

    /// 计算第 N 轮重试的等待时间（attempt 从 0 开始）
    ///
    /// 公式: initial_backoff * multiplier^attempt，结果不超过 max_backoff。
    /// f64 运算带来的微秒级精度损失对秒级退避可以接受。
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_backoff.as_millis() as f64;
        let backoff_ms = base_ms * self.multiplier.powi(attempt as i32);
        let capped_ms = backoff_ms.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// attempt 为已失败的轮次（从 0 计），小于 max_retries 时继续重试
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// 带重试的异步执行器
///
/// 对任意异步操作应用重试策略。仅当 `is_retryable` 判定为瞬时故障时重试，
/// 其余错误直接向上传播。
pub async fn retry_with_policy<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: impl Fn(&OrderError) -> bool,
    mut operation: F,
) -> Result<T, OrderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OrderError>>,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation = operation_name, attempt, "操作在重试后成功");
                }
                return Ok(value);
            }
            Err(err) => {
                if !is_retryable(&err) {
                    warn!(
                        operation = operation_name,
                        error = %err,
                        "操作失败且不可重试"
                    );
                    return Err(err);
                }

                if !policy.should_retry(attempt) {
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_retries = policy.max_retries,
                        error = %err,
                        "已达最大重试次数，放弃"
                    );
                    return Err(err);
                }

                let backoff = policy.backoff_for_attempt(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "操作失败，退避后重试"
                );

                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
