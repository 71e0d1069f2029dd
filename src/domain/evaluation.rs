// Per-metric evaluation: delta, trend and quality band
use super::sample::MetricId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TREND_EPSILON: f64 = 0.005;

/// Inclusive numeric range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub lo: f64,
    pub hi: f64,
}

impl Range {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }

    pub fn midpoint(&self) -> f64 {
        (self.lo + self.hi) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("{metric}: {band} range has lo {lo} above hi {hi}")]
    InvertedRange {
        metric: MetricId,
        band: &'static str,
        lo: f64,
        hi: f64,
    },
    #[error("{metric}: good range must have a non-zero width")]
    EmptyGoodRange { metric: MetricId },
    #[error("{metric}: reference value must be positive, got {reference}")]
    NonPositiveReference { metric: MetricId, reference: f64 },
}

/// Static thresholds for one metric. `fair` is checked only when the value
/// is outside `good`; everything else is poor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricThreshold {
    pub metric: MetricId,
    pub good: Range,
    pub fair: Range,
    /// Nominal value the "percent of reference" figure is relative to
    pub reference: f64,
}

impl MetricThreshold {
    pub fn defaults(metric: MetricId) -> Self {
        let (good, fair, reference) = match metric {
            MetricId::Ph => (Range::new(6.5, 8.5), Range::new(5.5, 9.5), 7.5),
            MetricId::Turbidity => (Range::new(0.0, 5.0), Range::new(5.0, 10.0), 5.0),
            MetricId::Temperature => (Range::new(20.0, 28.0), Range::new(10.0, 35.0), 25.0),
            MetricId::Tds => (Range::new(0.0, 500.0), Range::new(500.0, 1000.0), 500.0),
            MetricId::Conductivity => (Range::new(0.0, 1500.0), Range::new(1500.0, 3000.0), 1000.0),
        };
        Self {
            metric,
            good,
            fair,
            reference,
        }
    }

    pub fn validate(&self) -> Result<(), ThresholdError> {
        for (band, range) in [("good", self.good), ("fair", self.fair)] {
            if range.lo > range.hi {
                return Err(ThresholdError::InvertedRange {
                    metric: self.metric,
                    band,
                    lo: range.lo,
                    hi: range.hi,
                });
            }
        }
        if self.good.width() <= 0.0 {
            return Err(ThresholdError::EmptyGoodRange { metric: self.metric });
        }
        if self.reference <= 0.0 || !self.reference.is_finite() {
            return Err(ThresholdError::NonPositiveReference {
                metric: self.metric,
                reference: self.reference,
            });
        }
        Ok(())
    }

    pub fn band(&self, value: f64) -> Band {
        if self.good.contains(value) {
            Band::Good
        } else if self.fair.contains(value) {
            Band::Fair
        } else {
            Band::Poor
        }
    }
}

/// Thresholds for every metric, in `MetricId::ALL` order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdTable {
    entries: Vec<MetricThreshold>,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            entries: MetricId::ALL.into_iter().map(MetricThreshold::defaults).collect(),
        }
    }
}

impl ThresholdTable {
    /// Built-in defaults with `overrides` applied; the last override for a
    /// metric wins.
    pub fn with_overrides(
        overrides: impl IntoIterator<Item = MetricThreshold>,
    ) -> Result<Self, ThresholdError> {
        let mut table = Self::default();
        for threshold in overrides {
            threshold.validate()?;
            let slot = threshold.metric as usize;
            table.entries[slot] = threshold;
        }
        Ok(table)
    }

    pub fn get(&self, metric: MetricId) -> &MetricThreshold {
        // entries follow MetricId::ALL, which is declaration order
        &self.entries[metric as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Good,
    Fair,
    Poor,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEvaluation {
    pub metric: MetricId,
    /// Current value rounded to two decimals; `None` means no data
    pub value: Option<f64>,
    pub previous: Option<f64>,
    pub delta: Option<f64>,
    pub trend: Trend,
    pub band: Band,
    pub percent_of_reference: Option<f64>,
}

impl MetricEvaluation {
    pub fn has_data(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricEvaluator {
    epsilon: f64,
}

impl Default for MetricEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_TREND_EPSILON)
    }
}

impl MetricEvaluator {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.abs(),
        }
    }

    /// Pure function of its inputs: same arguments, same evaluation.
    pub fn evaluate(
        &self,
        current: Option<f64>,
        previous: Option<f64>,
        threshold: &MetricThreshold,
    ) -> MetricEvaluation {
        let previous = previous.filter(|p| p.is_finite());
        let Some(current) = current.filter(|c| c.is_finite()) else {
            return MetricEvaluation {
                metric: threshold.metric,
                value: None,
                previous,
                delta: None,
                trend: Trend::Unknown,
                band: Band::Unknown,
                percent_of_reference: None,
            };
        };

        let raw_delta = previous.map(|p| current - p);
        let trend = match raw_delta {
            None => Trend::Unknown,
            Some(d) if d.abs() < self.epsilon => Trend::Flat,
            Some(d) if d > 0.0 => Trend::Up,
            Some(_) => Trend::Down,
        };

        let value = round2(current);
        MetricEvaluation {
            metric: threshold.metric,
            value: Some(value),
            previous,
            delta: raw_delta.map(round2),
            trend,
            band: threshold.band(value),
            percent_of_reference: Some(round2(current / threshold.reference * 100.0)),
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
