//! 配置校验模块
//!
//! 校验规则：
//! - upstream.account_id 非空且为数字
//! - upstream.backoff_secs > 0
//! - upstream.stall_timeout_secs > 0
//! - store 参数齐全 (embedded path / relational url)
//! - chat.command_prefix 非空且不含空白

use contracts::{ContractError, RelayBlueprint, StoreConfig};

const RELATIONAL_SCHEMES: [&str; 3] = ["postgres://", "postgresql://", "sqlite:"];

/// 校验 RelayBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    validate_upstream(blueprint)?;
    validate_store(&blueprint.store)?;
    validate_chat(blueprint)?;
    Ok(())
}

/// 校验上游订阅配置
fn validate_upstream(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let upstream = &blueprint.upstream;

    if upstream.account_id.is_empty() {
        return Err(ContractError::config_validation(
            "upstream.account_id",
            "account_id cannot be empty",
        ));
    }
    if !upstream.account_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ContractError::config_validation(
            "upstream.account_id",
            format!("account_id must be numeric, got '{}'", upstream.account_id),
        ));
    }
    if upstream.backoff_secs == 0 {
        return Err(ContractError::config_validation(
            "upstream.backoff_secs",
            "backoff_secs must be > 0",
        ));
    }
    if upstream.stall_timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "upstream.stall_timeout_secs",
            "stall_timeout_secs must be > 0",
        ));
    }
    if upstream.api_base.is_empty() {
        return Err(ContractError::config_validation(
            "upstream.api_base",
            "api_base cannot be empty",
        ));
    }
    Ok(())
}

/// 校验存储后端配置
fn validate_store(store: &StoreConfig) -> Result<(), ContractError> {
    match store {
        StoreConfig::Memory => Ok(()),
        StoreConfig::Embedded { path } => {
            if path.as_os_str().is_empty() {
                return Err(ContractError::config_validation(
                    "store.path",
                    "embedded store path cannot be empty",
                ));
            }
            Ok(())
        }
        StoreConfig::Relational {
            url,
            max_connections,
        } => {
            if url.is_empty() {
                return Err(ContractError::config_validation(
                    "store.url",
                    "relational store url cannot be empty",
                ));
            }
            if !RELATIONAL_SCHEMES.iter().any(|s| url.starts_with(s)) {
                return Err(ContractError::config_validation(
                    "store.url",
                    format!("unsupported database url scheme in '{url}'"),
                ));
            }
            if *max_connections == 0 {
                return Err(ContractError::config_validation(
                    "store.max_connections",
                    "max_connections must be > 0",
                ));
            }
            Ok(())
        }
    }
}

/// 校验聊天平台配置
fn validate_chat(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let prefix = &blueprint.chat.command_prefix;
    if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
        return Err(ContractError::config_validation(
            "chat.command_prefix",
            "command_prefix cannot be empty or contain whitespace",
        ));
    }
    if blueprint.chat.api_base.is_empty() {
        return Err(ContractError::config_validation(
            "chat.api_base",
            "api_base cannot be empty",
        ));
    }
    Ok(())
}
