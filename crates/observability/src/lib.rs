//! # Observability
//!
//! 日志与指标的初始化入口。
//!
//! - `init_tracing`: 进程启动时由 CLI 调用一次，格式由 `--log-format` 决定，
//!   `RUST_LOG` 优先于命令行给出的级别
//! - `init_metrics`: `run` 指定 `--metrics-port` 时启动 Prometheus 导出
//! - `metrics`: 转发过程中各环节的计数器与直方图

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::metrics::{
    record_admin_command, record_delivery, record_item_filtered, record_item_received,
    record_item_relayed, record_owner_notification, record_relay_aborted,
    record_stream_reconnect, RunningStats, StatsSummary,
};

/// 日志配置
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub log_format: LogFormat,
    /// 未设置 RUST_LOG 时使用的过滤规则
    pub default_log_level: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            default_log_level: "info".to_string(),
        }
    }
}

impl TracingConfig {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// 每行一个 JSON 对象
    #[default]
    Json,
    Pretty,
    Compact,
}

/// 安装全局 tracing subscriber；重复调用返回错误
pub fn init_tracing(config: TracingConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(config.filter());

    let installed = match config.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_line_number(true))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    };
    installed.context("Failed to initialize tracing subscriber")?;

    tracing::debug!(log_format = ?config.log_format, "tracing initialized");
    Ok(())
}

/// Expose Prometheus metrics on `0.0.0.0:<port>`
pub fn init_metrics(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
