//! 消息来源抽象与 Kafka 实现
//!
//! 核心只依赖 `MessageSource`：一条惰性、无界、阻塞的原始字节负载序列，
//! 外加偏移量提交与关闭。`KafkaSource` 用 rdkafka 实现该能力，
//! 关闭自动提交——偏移量只在消费者排空阶段手动提交，
//! 崩溃时未提交的消息会被重投（至少一次语义）。

use async_trait::async_trait;
use rdkafka::Message;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use tracing::{debug, info};

use order_shared::config::KafkaConfig;
use order_shared::error::{OrderError, Result};

/// 消息来源能力接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// 阻塞等待下一条消息的原始负载；没有消息时一直等待，不做忙轮询
    async fn fetch(&self) -> Result<Vec<u8>>;

    /// 提交当前消费位点
    async fn commit(&self) -> Result<()>;

    /// 关闭底层连接；与提交结果无关，排空阶段总会调用
    async fn close(&self) -> Result<()>;
}

/// 基于 rdkafka 的消息来源
pub struct KafkaSource {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaSource {
    /// 创建并订阅配置的 topic
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.consumer_group)
            .set("auto.offset.reset", &config.auto_offset_reset)
            // 手动提交：只有排空阶段推进位点
            .set("enable.auto.commit", "false")
            .create()
            .map_err(|e| OrderError::Kafka(format!("创建消费者失败: {e}")))?;

        consumer
            .subscribe(&[&config.topic])
            .map_err(|e| OrderError::Kafka(format!("订阅 topic 失败: {e}")))?;

        info!(
            brokers = %config.brokers,
            group_id = %config.consumer_group,
            topic = %config.topic,
            "Kafka 消息来源已初始化"
        );

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
        })
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| OrderError::Kafka(format!("接收消息失败: {e}")))?;

        debug!(
            topic = %self.topic,
            partition = message.partition(),
            offset = message.offset(),
            "收到 Kafka 消息"
        );

        Ok(message.payload().map(|p| p.to_vec()).unwrap_or_default())
    }

    async fn commit(&self) -> Result<()> {
        self.consumer
            .commit_consumer_state(CommitMode::Sync)
            .map_err(|e| OrderError::Kafka(format!("提交偏移量失败: {e}")))
    }

    async fn close(&self) -> Result<()> {
        self.consumer.unsubscribe();
        info!(topic = %self.topic, "Kafka 消息来源已关闭");
        Ok(())
    }
}
