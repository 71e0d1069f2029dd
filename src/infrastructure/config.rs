// Configuration loading - config/dashboard.toml plus optional metric thresholds
use crate::application::poll_scheduler::{validate_interval, SchedulerSettings};
use crate::domain::evaluation::{MetricThreshold, Range, ThresholdTable, DEFAULT_TREND_EPSILON};
use crate::domain::history::DEFAULT_HISTORY_CAPACITY;
use crate::domain::quality::ScoringPolicy;
use crate::domain::sample::MetricId;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub source: SourceSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceSettings {
    Http {
        current_url: String,
        history_url: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    File {
        current_path: PathBuf,
        history_path: PathBuf,
    },
}

fn default_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingSettings {
    pub interval_ms: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self { interval_ms: 4000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistorySettings {
    pub capacity: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/state.json"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringSettings {
    #[serde(default)]
    pub policy: ScoringPolicy,
    #[serde(default = "default_trend_epsilon")]
    pub trend_epsilon: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            policy: ScoringPolicy::default(),
            trend_epsilon: DEFAULT_TREND_EPSILON,
        }
    }
}

fn default_trend_epsilon() -> f64 {
    DEFAULT_TREND_EPSILON
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetricsConfig {
    #[serde(default)]
    pub metrics: Vec<MetricConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricConfig {
    pub id: MetricId,
    pub good: Range,
    pub fair: Range,
    pub reference: Option<f64>,
}

impl MetricConfig {
    fn to_threshold(&self) -> MetricThreshold {
        MetricThreshold {
            metric: self.id,
            good: self.good,
            fair: self.fair,
            reference: self
                .reference
                .unwrap_or_else(|| MetricThreshold::defaults(self.id).reference),
        }
    }
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard"))
        .add_source(config::Environment::with_prefix("WQ").separator("__").try_parsing(true))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_metrics_config() -> anyhow::Result<MetricsConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/metrics").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Validate and combine both files into scheduler settings
pub fn scheduler_settings(
    dashboard: &DashboardConfig,
    metrics: &MetricsConfig,
) -> anyhow::Result<SchedulerSettings> {
    validate_interval(dashboard.polling.interval_ms)?;
    if dashboard.history.capacity == 0 {
        anyhow::bail!("history.capacity must be at least 1");
    }

    let thresholds = ThresholdTable::with_overrides(metrics.metrics.iter().map(MetricConfig::to_threshold))?;

    Ok(SchedulerSettings {
        interval_ms: dashboard.polling.interval_ms,
        history_capacity: dashboard.history.capacity,
        thresholds,
        policy: dashboard.scoring.policy,
        trend_epsilon: dashboard.scoring.trend_epsilon,
    })
}
