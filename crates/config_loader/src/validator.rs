//! 配置校验模块
//!
//! 校验规则：
//! - worker_count 在 1..=256
//! - 所有时长 > 0
//! - topic_ready_attempts >= 1
//! - project / topic 非空
//! - 至少一个 search endpoint 条目 (格式错误的条目在搜索时跳过，不在此处拒绝)
//! - vehicle_list_url 为 http(s) 地址

use contracts::{ContractError, PipelineSettings};
use url::Url;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 PipelineSettings
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(settings: &PipelineSettings) -> Result<(), ContractError> {
    validate_fields(settings)?;
    validate_listing_url(settings)?;
    Ok(())
}

/// 校验字段约束 (derive 规则)
fn validate_fields(settings: &PipelineSettings) -> Result<(), ContractError> {
    match settings.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_error("", &errors)
                .unwrap_or_else(|| ("settings".to_string(), "invalid".to_string()));
            Err(ContractError::config_validation(field, message))
        }
    }
}

/// 校验列表页地址
fn validate_listing_url(settings: &PipelineSettings) -> Result<(), ContractError> {
    let url = Url::parse(&settings.vehicle_list_url).map_err(|e| {
        ContractError::config_validation("vehicle_list_url", format!("invalid url: {e}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ContractError::config_validation(
            "vehicle_list_url",
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(())
}

/// 按字段名排序后取第一个错误，嵌套字段以 `.` 连接
fn first_error(prefix: &str, errors: &ValidationErrors) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(error) = list.first() {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' check", error.code));
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_error(&path, inner) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                if let Some((_, inner)) = items.iter().next() {
                    if let Some(found) = first_error(&path, inner) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}
