//! # Dispatcher
//!
//! 扇出分发模块。
//!
//! 负责：
//! - 每个条目读取一次目的地快照
//! - 并发投递到所有频道，等待全部完成后返回
//! - 投递失败时私信通知 guild owner（只尝试一次，失败仅记录日志）

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod notify;

pub use dispatcher::FanoutDispatcher;
pub use error::{DeliveryError, NotificationError};
pub use metrics::{DispatchMetrics, DispatchMetricsSnapshot};
pub use notify::{notify_owner, owner_notice};
