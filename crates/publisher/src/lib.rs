//! # Publisher
//!
//! 发布模块。
//!
//! 负责：
//! - 首次发布前轮询确认 topic 存在 (有限次数，固定间隔)，失败则整个运行终止
//! - 每个命中结果序列化为一条消息发布，并同步等待确认
//! - 发布失败只影响当前任务，不重试

pub mod client;
pub mod error;
pub mod mock;
pub mod publisher;

pub use client::{DryRunClient, LocalTopicClient, PubSubRestClient, TopicClient, PUBSUB_API};
pub use error::{PublishError, Result};
pub use mock::MockTopicClient;
pub use publisher::MatchPublisher;
