//! 配置文件解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。文件中的每个字段都是可选的，
//! 缺失的字段由环境变量或默认值补齐。

use contracts::ContractError;
use serde::Deserialize;

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 配置文件层
///
/// 时长字段使用 humantime 字符串 (如 `"5s"`, `"750ms"`)。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    pub vehicle_list_url: Option<String>,
    pub search_apis: Option<Vec<String>>,
    pub request_timeout: Option<String>,
    pub worker_count: Option<i64>,
    pub publish_timeout: Option<String>,
    pub topic_ready_attempts: Option<i64>,
    pub topic_ready_delay: Option<String>,
    pub gcp_project_id: Option<String>,
    pub pubsub_topic: Option<String>,
    pub pubsub_emulator_host: Option<String>,
    pub pubsub_access_token: Option<String>,
}

impl SettingsFile {
    /// 以字符串形式读取字段 (与环境变量同一表示)
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "vehicle_list_url" => self.vehicle_list_url.clone(),
            "search_apis" => self.search_apis.as_ref().map(|apis| apis.join(",")),
            "request_timeout" => self.request_timeout.clone(),
            "worker_count" => self.worker_count.map(|n| n.to_string()),
            "publish_timeout" => self.publish_timeout.clone(),
            "topic_ready_attempts" => self.topic_ready_attempts.map(|n| n.to_string()),
            "topic_ready_delay" => self.topic_ready_delay.clone(),
            "gcp_project_id" => self.gcp_project_id.clone(),
            "pubsub_topic" => self.pubsub_topic.clone(),
            "pubsub_emulator_host" => self.pubsub_emulator_host.clone(),
            "pubsub_access_token" => self.pubsub_access_token.clone(),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<SettingsFile, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<SettingsFile, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<SettingsFile, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}
