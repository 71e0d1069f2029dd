// Composite water-quality scoring
use super::evaluation::{Band, MetricEvaluation, Range, ThresholdTable};
use serde::{Deserialize, Serialize};

const WEIGHTED_SCORE_CEILING: f64 = 150.0;

/// How per-metric evaluations collapse into one composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringPolicy {
    /// Share of metrics in the good band, 0.0..=1.0
    #[default]
    Ratio,
    /// Mean distance-from-ideal score, 0..=150
    Weighted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityScore {
    pub policy: ScoringPolicy,
    pub composite: f64,
    pub condition: Condition,
    /// Metrics that had data and took part in the score
    pub metrics_scored: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QualityScorer {
    policy: ScoringPolicy,
}

impl QualityScorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    /// Metrics without data are left out of the computation entirely.
    pub fn score(&self, evaluations: &[MetricEvaluation], thresholds: &ThresholdTable) -> QualityScore {
        let scored: Vec<&MetricEvaluation> = evaluations.iter().filter(|e| e.has_data()).collect();

        let (composite, condition) = match self.policy {
            ScoringPolicy::Ratio => {
                let good = scored.iter().filter(|e| e.band == Band::Good).count();
                let ratio = if scored.is_empty() {
                    0.0
                } else {
                    good as f64 / scored.len() as f64
                };
                (ratio, condition_for(ratio, 0.8, 0.5))
            }
            ScoringPolicy::Weighted => {
                let scores: Vec<f64> = scored
                    .iter()
                    .filter_map(|e| {
                        let ideal = &thresholds.get(e.metric).good;
                        e.value.map(|value| distance_score(value, ideal))
                    })
                    .collect();
                let mean = if scores.is_empty() {
                    0.0
                } else {
                    scores.iter().sum::<f64>() / scores.len() as f64
                };
                let composite = mean.clamp(0.0, WEIGHTED_SCORE_CEILING);
                (composite, condition_for(composite, 80.0, 50.0))
            }
        };

        QualityScore {
            policy: self.policy,
            composite,
            condition,
            metrics_scored: scored.len(),
        }
    }
}

fn condition_for(value: f64, good_floor: f64, fair_floor: f64) -> Condition {
    if value >= good_floor {
        Condition::Good
    } else if value >= fair_floor {
        Condition::Fair
    } else {
        Condition::Poor
    }
}

/// 100 at the midpoint of the ideal range. Undershoot scores above 100,
/// capped at the ceiling; overshoot decays to zero.
fn distance_score(value: f64, ideal: &Range) -> f64 {
    let mid = ideal.midpoint();
    let width = ideal.width();
    if width <= 0.0 {
        return if value == ideal.lo { 100.0 } else { 0.0 };
    }

    if value < ideal.lo {
        (100.0 + (mid - value) / width * 50.0).min(WEIGHTED_SCORE_CEILING)
    } else if value > ideal.hi {
        (100.0 - (value - ideal.hi) / width * 50.0).max(0.0)
    } else {
        100.0 - ((value - mid) / width * 100.0).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluation::{MetricEvaluator, MetricThreshold};
    use crate::domain::sample::MetricId;

    fn evaluate_all(values: [Option<f64>; 5], thresholds: &ThresholdTable) -> Vec<MetricEvaluation> {
        let evaluator = MetricEvaluator::default();
        MetricId::ALL
            .iter()
            .zip(values)
            .map(|(metric, value)| evaluator.evaluate(value, None, thresholds.get(*metric)))
            .collect()
    }

    #[test]
    fn test_ratio_policy_mixed_reading_is_fair() {
        let thresholds = ThresholdTable::default();
        let evals = evaluate_all(
            [Some(7.0), Some(3.0), Some(30.0), Some(200.0), Some(1600.0)],
            &thresholds,
        );

        let score = QualityScorer::new(ScoringPolicy::Ratio).score(&evals, &thresholds);
        assert_eq!(score.composite, 0.6);
        assert_eq!(score.condition, Condition::Fair);
        assert_eq!(score.metrics_scored, 5);
    }

    #[test]
    fn test_ratio_policy_excludes_absent_metrics() {
        let thresholds = ThresholdTable::default();
        let evals = evaluate_all([Some(7.0), None, None, Some(200.0), Some(1600.0)], &thresholds);

        let score = QualityScorer::default().score(&evals, &thresholds);
        assert_eq!(score.metrics_scored, 3);
        assert!((score.composite - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(score.condition, Condition::Fair);

        let empty = evaluate_all([None; 5], &thresholds);
        let score = QualityScorer::default().score(&empty, &thresholds);
        assert_eq!(score.composite, 0.0);
        assert_eq!(score.condition, Condition::Poor);
    }

    #[test]
    fn test_weighted_policy_scores_distance_from_midpoint() {
        let ph = Range::new(6.5, 8.5);
        assert_eq!(distance_score(7.5, &ph), 100.0);
        assert_eq!(distance_score(8.0, &ph), 75.0);
        assert_eq!(distance_score(9.5, &ph), 75.0);
        assert_eq!(distance_score(12.5, &ph), 0.0);
        assert_eq!(distance_score(5.5, &ph), 150.0);
        assert_eq!(distance_score(-100.0, &ph), 150.0);
    }

    #[test]
    fn test_weighted_policy_condition() {
        let thresholds = ThresholdTable::default();
        let evals = evaluate_all([Some(7.5), Some(2.5), Some(24.0), None, None], &thresholds);
        let score = QualityScorer::new(ScoringPolicy::Weighted).score(&evals, &thresholds);
        assert_eq!(score.composite, 100.0);
        assert_eq!(score.condition, Condition::Good);

        let evals = evaluate_all([Some(12.5), Some(15.0), Some(44.0), None, None], &thresholds);
        let score = QualityScorer::new(ScoringPolicy::Weighted).score(&evals, &thresholds);
        assert_eq!(score.composite, 0.0);
        assert_eq!(score.condition, Condition::Poor);
    }

    #[test]
    fn test_weighted_policy_uses_configured_ideal_range() {
        let thresholds = ThresholdTable::with_overrides([MetricThreshold {
            good: crate::domain::evaluation::Range::new(7.0, 8.0),
            ..MetricThreshold::defaults(MetricId::Ph)
        }])
        .unwrap();
        let evals = evaluate_all([Some(7.75), None, None, None, None], &thresholds);
        let score = QualityScorer::new(ScoringPolicy::Weighted).score(&evals, &thresholds);
        assert_eq!(score.composite, 75.0);
        assert_eq!(score.condition, Condition::Fair);
    }
}
