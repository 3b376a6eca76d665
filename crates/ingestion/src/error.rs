//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
///
/// 列表获取失败时无法开展任何工作，调用方应将其视为致命错误。
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 请求列表页失败
    #[error("failed to fetch vehicle list from {url}: {message}")]
    Request {
        /// 列表页地址
        url: String,
        /// 错误消息
        message: String,
    },

    /// 列表页返回非 200 状态
    #[error("vehicle list request to {url} failed with status {status}")]
    Status {
        /// 列表页地址
        url: String,
        /// HTTP 状态码
        status: u16,
    },

    /// CSS 选择器无效
    #[error("invalid selector '{selector}': {message}")]
    Selector {
        /// 选择器
        selector: String,
        /// 错误消息
        message: String,
    },
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
