//! 统一错误处理模块
//!
//! 定义订单服务全部的错误类型，使用 thiserror 提供良好的错误信息。
//! 分类与处理策略：
//! - 校验错误：用户可修正，从不重试、从不落库
//! - 未找到 / 已存在：原样上抛给调用方，不触碰缓存
//! - 数据库 / Kafka 错误：瞬时基础设施故障，仅偏移量提交路径会重试

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum OrderError {
    // ==================== 数据库错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("订单未找到: uid={id}")]
    NotFound { id: String },

    #[error("订单已存在: uid={id}")]
    AlreadyExists { id: String },

    // ==================== Kafka 错误 ====================
    #[error("Kafka 错误: {0}")]
    Kafka(String),

    #[error("消息反序列化失败: {0}")]
    Deserialization(String),

    // ==================== 校验错误 ====================
    /// 字段级批量校验报告，每行一条 `字段路径: 规则名`
    #[error("订单校验失败:\n{0}")]
    Validation(String),

    // ==================== 通用错误 ====================
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, OrderError>;

impl OrderError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::Kafka(_) => "KAFKA_ERROR",
            Self::Deserialization(_) => "DESERIALIZATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 只有瞬时基础设施故障可重试；业务结果（校验失败、未找到、重复）重试没有意义。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Kafka(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = OrderError::NotFound {
            id: "b563feb7-b2b8-4b6a-9d7a-000000000001".to_string(),
        };
        assert_eq!(err.code(), "NOT_FOUND");

        let err = OrderError::Validation("order_uid: required".to_string());
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_is_retryable() {
        let db_err = OrderError::Database(sqlx::Error::PoolTimedOut);
        assert!(db_err.is_retryable());

        let kafka_err = OrderError::Kafka("broker 不可达".to_string());
        assert!(kafka_err.is_retryable());

        let conflict = OrderError::AlreadyExists {
            id: "abc".to_string(),
        };
        assert!(!conflict.is_retryable());

        let validation = OrderError::Validation("payment.amount: required".to_string());
        assert!(!validation.is_retryable());
    }

    #[test]
    fn test_validation_display_is_multiline() {
        let err = OrderError::Validation("order_uid: required\ndelivery.city: required".to_string());
        let text = err.to_string();
        assert!(text.contains("order_uid: required"));
        assert!(text.contains("delivery.city: required"));
    }
}
