// Dashboard state owned by the poll scheduler, and the view handed to presentation
use super::evaluation::{MetricEvaluation, MetricEvaluator, ThresholdTable};
use super::history::HistoryBuffer;
use super::quality::{QualityScore, QualityScorer};
use super::sample::{MetricId, Sample};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerPhase {
    Idle,
    Polling,
    Live,
    /// Fetched fine, but the sample predates the history tail
    Stale,
    Error,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollState {
    pub phase: SchedulerPhase,
    pub interval_ms: u64,
    pub last_error: bool,
    /// Failed cycles since the process started
    pub missed_cycles: u64,
    pub consecutive_failures: u64,
    /// Cycles whose sample was older than the history tail
    pub stale_cycles: u64,
    pub consecutive_stale: u64,
    /// Persisted across restarts
    pub total_updates: u64,
    /// Persisted across restarts
    pub session_start: DateTime<Utc>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl PollState {
    pub fn new(interval_ms: u64, total_updates: u64, session_start: DateTime<Utc>) -> Self {
        Self {
            phase: SchedulerPhase::Idle,
            interval_ms,
            last_error: false,
            missed_cycles: 0,
            consecutive_failures: 0,
            stale_cycles: 0,
            consecutive_stale: 0,
            total_updates,
            session_start,
            last_updated: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.phase == SchedulerPhase::Live
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Accepted,
    /// The sample predates the history tail and was ignored
    Stale {
        sample_time: DateTime<Utc>,
        tail_time: DateTime<Utc>,
    },
}

/// Everything the presentation layer needs after a cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub evaluations: Vec<MetricEvaluation>,
    pub score: Option<QualityScore>,
    pub history: Vec<Sample>,
    pub data_count: usize,
    pub poll: PollState,
    pub live: bool,
    pub uptime_secs: i64,
    pub theme: Theme,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    history: HistoryBuffer,
    thresholds: ThresholdTable,
    evaluator: MetricEvaluator,
    scorer: QualityScorer,
    previous: [Option<f64>; 5],
    evaluations: Vec<MetricEvaluation>,
    score: Option<QualityScore>,
    poll: PollState,
    theme: Theme,
}

impl DashboardState {
    pub fn new(
        history: HistoryBuffer,
        thresholds: ThresholdTable,
        evaluator: MetricEvaluator,
        scorer: QualityScorer,
        poll: PollState,
        theme: Theme,
    ) -> Self {
        Self {
            history,
            thresholds,
            evaluator,
            scorer,
            previous: [None; 5],
            evaluations: Vec::new(),
            score: None,
            poll,
            theme,
        }
    }

    /// Seed history from a bulk source; returns the number of entries dropped
    /// for being out of order.
    pub fn seed_history(&mut self, samples: Vec<Sample>) -> usize {
        self.history.seed(samples)
    }

    /// Push, evaluate every metric against its previous value, then score.
    pub fn ingest(&mut self, sample: Sample) -> IngestOutcome {
        if let Some(tail_time) = self.history.tail_timestamp() {
            if sample.timestamp < tail_time {
                return IngestOutcome::Stale {
                    sample_time: sample.timestamp,
                    tail_time,
                };
            }
        }

        let evaluations: Vec<MetricEvaluation> = MetricId::ALL
            .iter()
            .map(|&metric| {
                self.evaluator.evaluate(
                    sample.value(metric),
                    self.previous[metric as usize],
                    self.thresholds.get(metric),
                )
            })
            .collect();

        for metric in MetricId::ALL {
            if let Some(value) = sample.value(metric) {
                self.previous[metric as usize] = Some(value);
            }
        }

        self.score = Some(self.scorer.score(&evaluations, &self.thresholds));
        self.evaluations = evaluations;
        self.history.push(sample);
        IngestOutcome::Accepted
    }

    pub fn begin_cycle(&mut self) {
        self.poll.phase = SchedulerPhase::Polling;
    }

    /// Mark the cycle live after an accepted sample; returns the new total.
    pub fn complete_cycle(&mut self, now: DateTime<Utc>) -> u64 {
        self.poll.phase = SchedulerPhase::Live;
        self.poll.last_error = false;
        self.poll.consecutive_failures = 0;
        self.poll.consecutive_stale = 0;
        self.poll.total_updates += 1;
        self.poll.last_updated = Some(now);
        self.poll.total_updates
    }

    /// The fetch worked but nothing was ingested. Not live, not an error.
    pub fn stale_cycle(&mut self) {
        self.poll.phase = SchedulerPhase::Stale;
        self.poll.last_error = false;
        self.poll.consecutive_failures = 0;
        self.poll.stale_cycles += 1;
        self.poll.consecutive_stale += 1;
    }

    pub fn fail_cycle(&mut self) {
        self.poll.phase = SchedulerPhase::Error;
        self.poll.last_error = true;
        self.poll.missed_cycles += 1;
        self.poll.consecutive_failures += 1;
    }

    pub fn set_interval_ms(&mut self, interval_ms: u64) {
        self.poll.interval_ms = interval_ms;
    }

    pub fn stop(&mut self) {
        self.poll.phase = SchedulerPhase::Stopped;
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn evaluations(&self) -> &[MetricEvaluation] {
        &self.evaluations
    }

    pub fn score(&self) -> Option<&QualityScore> {
        self.score.as_ref()
    }

    pub fn poll(&self) -> &PollState {
        &self.poll
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn view(&self, now: DateTime<Utc>) -> DashboardView {
        DashboardView {
            evaluations: self.evaluations().to_vec(),
            score: self.score().cloned(),
            history: self.history.snapshot(),
            data_count: self.history.count(),
            poll: self.poll.clone(),
            live: self.poll.is_live(),
            uptime_secs: (now - self.poll.session_start).num_seconds().max(0),
            theme: self.theme(),
            generated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluation::{Band, Trend};
    use crate::domain::quality::Condition;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn state(capacity: usize) -> DashboardState {
        DashboardState::new(
            HistoryBuffer::new(capacity),
            ThresholdTable::default(),
            MetricEvaluator::default(),
            QualityScorer::default(),
            PollState::new(4000, 0, start()),
            Theme::Dark,
        )
    }

    fn reading(second: i64, ph: Option<f64>, temperature: Option<f64>) -> Sample {
        Sample {
            ph,
            temperature,
            ..Sample::empty(start() + Duration::seconds(second))
        }
    }

    #[test]
    fn test_ingest_tracks_previous_values_per_metric() {
        let mut state = state(10);
        assert_eq!(state.ingest(reading(0, Some(7.0), None)), IngestOutcome::Accepted);
        assert_eq!(state.evaluations()[MetricId::Ph as usize].trend, Trend::Unknown);

        state.ingest(reading(4, Some(7.4), Some(24.0)));
        let ph = &state.evaluations()[MetricId::Ph as usize];
        assert_eq!(ph.trend, Trend::Up);
        assert_eq!(ph.delta, Some(0.4));

        // temperature had no earlier reading
        let temperature = &state.evaluations()[MetricId::Temperature as usize];
        assert_eq!(temperature.trend, Trend::Unknown);

        // a gap keeps the last known value as the baseline
        state.ingest(reading(8, None, Some(24.0)));
        state.ingest(reading(12, Some(7.1), Some(24.0)));
        let ph = &state.evaluations()[MetricId::Ph as usize];
        assert_eq!(ph.previous, Some(7.4));
        assert_eq!(ph.trend, Trend::Down);
        assert_eq!(state.evaluations()[MetricId::Temperature as usize].trend, Trend::Flat);
    }

    #[test]
    fn test_stale_sample_is_ignored() {
        let mut state = state(10);
        state.ingest(reading(10, Some(7.0), None));
        let before = state.view(start());

        let outcome = state.ingest(reading(5, Some(9.9), None));
        assert!(matches!(outcome, IngestOutcome::Stale { .. }));
        assert_eq!(state.view(start()), before);

        // equal timestamps are still chronological
        assert_eq!(state.ingest(reading(10, Some(7.1), None)), IngestOutcome::Accepted);
        assert_eq!(state.history().count(), 2);
    }

    #[test]
    fn test_score_recomputed_each_ingest() {
        let mut state = state(10);
        assert!(state.score().is_none());

        state.ingest(reading(0, Some(7.0), Some(24.0)));
        assert_eq!(state.score().map(|s| s.condition), Some(Condition::Good));

        state.ingest(reading(4, Some(11.0), Some(40.0)));
        let score = state.score().unwrap();
        assert_eq!(score.condition, Condition::Poor);
        assert_eq!(score.metrics_scored, 2);
        assert_eq!(state.evaluations()[MetricId::Ph as usize].band, Band::Poor);
    }

    #[test]
    fn test_cycle_bookkeeping() {
        let mut state = state(10);
        state.begin_cycle();
        assert_eq!(state.poll().phase, SchedulerPhase::Polling);

        state.fail_cycle();
        state.fail_cycle();
        assert!(!state.poll().is_live());
        assert_eq!(state.poll().consecutive_failures, 2);

        let now = start() + Duration::seconds(90);
        assert_eq!(state.complete_cycle(now), 1);
        assert!(state.poll().is_live());
        assert_eq!(state.poll().missed_cycles, 2);
        assert_eq!(state.poll().consecutive_failures, 0);

        let view = state.view(now);
        assert!(view.live);
        assert_eq!(view.uptime_secs, 90);
        assert_eq!(view.poll.last_updated, Some(now));
    }

    #[test]
    fn test_stale_cycles_are_not_live() {
        let mut state = state(10);
        let now = start() + Duration::seconds(30);
        state.complete_cycle(now);

        state.stale_cycle();
        state.stale_cycle();
        let view = state.view(now);
        assert!(!view.live);
        assert_eq!(view.poll.phase, SchedulerPhase::Stale);
        assert!(!view.poll.last_error);
        assert_eq!(view.poll.stale_cycles, 2);
        assert_eq!(view.poll.consecutive_stale, 2);
        assert_eq!(view.poll.total_updates, 1);

        state.complete_cycle(now);
        assert!(state.poll().is_live());
        assert_eq!(state.poll().stale_cycles, 2);
        assert_eq!(state.poll().consecutive_stale, 0);
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!(Theme::parse("light"), Some(Theme::Light));
        assert_eq!(Theme::parse("sepia"), None);
        assert_eq!(Theme::default().as_str(), "dark");
    }
}
