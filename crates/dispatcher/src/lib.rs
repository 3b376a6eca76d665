//! # Dispatcher
//!
//! 搜索分发模块。
//!
//! 负责：
//! - 将一次搜索并发 fan-out 到所有合法的 search endpoint
//! - 第一个 `is_hirer_vehicle == true` 的结果胜出，其余请求被取消
//! - 共享截止时间，超时返回 `None`
//! - 返回前等待所有子任务结束

pub mod classifier;
pub mod dispatcher;
pub mod endpoint;
pub mod metrics;
pub mod mock;
pub mod stop;
pub mod transport;

pub use classifier::{classify, Classification};
pub use contracts::{EndpointOutcome, EndpointResult, MatchEnvelope};
pub use dispatcher::{SearchDispatcher, SearchReport};
pub use endpoint::{parse_endpoints, SearchEndpoint};
pub use metrics::{MetricsSnapshot, SearchMetrics};
pub use mock::{MockReply, MockResponse, MockTransport};
pub use stop::StopSignal;
pub use transport::{HttpTransport, LocalSearchTransport, SearchTransport};
