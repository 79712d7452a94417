//! Relay 指标收集模块
//!
//! 通过 `metrics` facade 记录，Prometheus exporter 负责导出。

use metrics::{counter, gauge, histogram};

/// 记录上游条目接收
pub fn record_item_received(source: &str) {
    counter!(
        "kirb_relay_items_received_total",
        "source" => source.to_string()
    )
    .increment(1);
}

/// 记录被过滤的条目 (reason: reshare / quote / reply)
pub fn record_item_filtered(reason: &'static str) {
    counter!("kirb_relay_items_filtered_total", "reason" => reason).increment(1);
}

/// 记录一次完整的扇出
pub fn record_item_relayed(destinations: usize, duration_ms: f64) {
    counter!("kirb_relay_items_relayed_total").increment(1);
    gauge!("kirb_relay_destinations").set(destinations as f64);
    histogram!("kirb_relay_fanout_duration_ms").record(duration_ms);
}

/// 记录快照失败导致的扇出放弃
pub fn record_relay_aborted() {
    counter!("kirb_relay_items_aborted_total").increment(1);
}

/// 记录单个目的地的投递结果
pub fn record_delivery(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("kirb_relay_deliveries_total", "status" => status).increment(1);
}

/// 记录 owner 通知结果 (stage: delivered / owner_lookup / private_channel / send)
pub fn record_owner_notification(stage: &'static str) {
    counter!("kirb_relay_owner_notifications_total", "stage" => stage).increment(1);
}

/// 记录上游重连
pub fn record_stream_reconnect(reason: &'static str) {
    counter!("kirb_relay_stream_reconnects_total", "reason" => reason).increment(1);
}

/// 记录管理命令
pub fn record_admin_command(command: &'static str, outcome: &'static str) {
    counter!(
        "kirb_relay_admin_commands_total",
        "command" => command,
        "outcome" => outcome
    )
    .increment(1);
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
