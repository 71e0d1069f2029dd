// Poll scheduler - Drives fetch-and-ingest cycles and owns the dashboard state
use crate::application::presentation_sink::PresentationSink;
use crate::application::sample_source::{SampleSource, SourceError};
use crate::application::state_store::{
    load_or_init_session_start, load_theme, load_total_updates, save_theme, save_total_updates,
    StateStore,
};
use crate::domain::dashboard::{DashboardState, IngestOutcome, PollState, Theme};
use crate::domain::evaluation::{MetricEvaluator, ThresholdTable};
use crate::domain::history::HistoryBuffer;
use crate::domain::quality::{QualityScorer, ScoringPolicy};
use crate::domain::sample::{parse_sample, parse_samples};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const MIN_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("poll interval {requested}ms is below the {floor}ms floor")]
    IntervalBelowFloor { requested: u64, floor: u64 },
    #[error("scheduler is stopped")]
    Stopped,
}

pub fn validate_interval(interval_ms: u64) -> Result<Duration, SchedulerError> {
    if interval_ms < MIN_INTERVAL_MS {
        return Err(SchedulerError::IntervalBelowFloor {
            requested: interval_ms,
            floor: MIN_INTERVAL_MS,
        });
    }
    Ok(Duration::from_millis(interval_ms))
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub interval_ms: u64,
    pub history_capacity: usize,
    pub thresholds: ThresholdTable,
    pub policy: ScoringPolicy,
    pub trend_epsilon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Ingested,
    /// Fetched fine but older than the history tail
    Stale,
    Failed,
}

enum Command {
    Reconfigure {
        interval_ms: u64,
        reply: oneshot::Sender<Result<(), SchedulerError>>,
    },
    SetTheme(Theme),
}

pub struct PollScheduler {
    source: Arc<dyn SampleSource>,
    store: Box<dyn StateStore>,
    sink: Arc<dyn PresentationSink>,
    state: DashboardState,
}

impl PollScheduler {
    /// Restores the persisted counters and theme from `store`.
    pub fn new(
        source: Arc<dyn SampleSource>,
        mut store: Box<dyn StateStore>,
        sink: Arc<dyn PresentationSink>,
        settings: SchedulerSettings,
    ) -> Result<Self, SchedulerError> {
        validate_interval(settings.interval_ms)?;

        let total_updates = load_total_updates(store.as_ref());
        let session_start = load_or_init_session_start(store.as_mut(), Utc::now());
        let theme = load_theme(store.as_ref());

        let state = DashboardState::new(
            HistoryBuffer::new(settings.history_capacity),
            settings.thresholds,
            MetricEvaluator::new(settings.trend_epsilon),
            QualityScorer::new(settings.policy),
            PollState::new(settings.interval_ms, total_updates, session_start),
            theme,
        );

        Ok(Self {
            source,
            store,
            sink,
            state,
        })
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Pre-fill history from the bulk history document. Failures leave the
    /// buffer empty. Nothing is published until the first cycle has run.
    /// Returns the number of samples held afterwards.
    pub async fn seed_history(&mut self) -> usize {
        let fallback = Utc::now();
        match self.source.fetch_history().await {
            Ok(raw) if raw.is_array() => {
                let samples = parse_samples(&raw, fallback);
                let received = samples.len();
                let dropped = self.state.seed_history(samples);
                if dropped > 0 {
                    tracing::debug!("Dropped {} out-of-order history entries", dropped);
                }
                tracing::info!(
                    "Seeded history with {} of {} samples from {}",
                    self.state.history().count(),
                    received,
                    self.source.describe()
                );
            }
            Ok(_) => tracing::warn!("History document is not an array, starting empty"),
            Err(e) => tracing::warn!("History unavailable, starting empty: {}", e),
        }
        self.state.history().count()
    }

    /// One fetch-and-ingest cycle. Never fails: errors are recorded in the
    /// poll state and leave history and score untouched.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.state.begin_cycle();
        let issued_at = Utc::now();

        let outcome = match self.source.fetch_current().await.and_then(require_object) {
            Ok(raw) => {
                let parsed = parse_sample(&raw, issued_at);
                if !parsed.issues.is_empty() {
                    tracing::debug!("Reading has unusable fields: {:?}", parsed.issues);
                }

                match self.state.ingest(parsed.sample) {
                    IngestOutcome::Accepted => {
                        let total = self.state.complete_cycle(Utc::now());
                        save_total_updates(self.store.as_mut(), total);
                        CycleOutcome::Ingested
                    }
                    IngestOutcome::Stale {
                        sample_time,
                        tail_time,
                    } => {
                        self.state.stale_cycle();
                        if self.state.poll().consecutive_stale == 1 {
                            tracing::warn!(
                                "Source is serving samples older than history tail {}",
                                tail_time
                            );
                        }
                        tracing::debug!(
                            "Ignoring sample from {} ({} stale cycles in a row)",
                            sample_time,
                            self.state.poll().consecutive_stale
                        );
                        CycleOutcome::Stale
                    }
                }
            }
            Err(e) => {
                self.state.fail_cycle();
                tracing::warn!(
                    "Poll cycle failed ({} consecutive): {}",
                    self.state.poll().consecutive_failures,
                    e
                );
                CycleOutcome::Failed
            }
        };

        self.publish();
        outcome
    }

    /// Change the polling interval. Rejected intervals leave it unchanged.
    pub fn reconfigure_interval(&mut self, interval_ms: u64) -> Result<(), SchedulerError> {
        if let Err(e) = validate_interval(interval_ms) {
            tracing::warn!("Rejected interval change: {}", e);
            return Err(e);
        }
        tracing::info!(
            "Poll interval changed from {}ms to {}ms",
            self.state.poll().interval_ms,
            interval_ms
        );
        self.state.set_interval_ms(interval_ms);
        Ok(())
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.state.set_theme(theme);
        save_theme(self.store.as_mut(), theme);
        self.publish();
    }

    /// Spawn the polling task: an immediate cycle, then one every interval.
    pub fn start(self) -> SchedulerHandle {
        let (commands, command_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(command_rx, cancel.clone()));

        SchedulerHandle {
            commands,
            cancel,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>, cancel: CancellationToken) -> Self {
        // Capacity 1: a tick that arrives while a cycle is running waits,
        // further ticks are skipped by the interval.
        let (tick_tx, mut ticks) = mpsc::channel::<u64>(1);
        let mut epoch = 0u64;
        let mut schedule = cancel.child_token();
        spawn_schedule(epoch, self.interval(), true, tick_tx.clone(), schedule.clone());
        tracing::info!(
            "Polling {} every {}ms",
            self.source.describe(),
            self.state.poll().interval_ms
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(command) = commands.recv() => match command {
                    Command::Reconfigure { interval_ms, reply } => {
                        let result = self.reconfigure_interval(interval_ms);
                        if result.is_ok() {
                            schedule.cancel();
                            epoch += 1;
                            schedule = cancel.child_token();
                            spawn_schedule(epoch, self.interval(), false, tick_tx.clone(), schedule.clone());
                        }
                        let _ = reply.send(result);
                    }
                    Command::SetTheme(theme) => self.set_theme(theme),
                },
                Some(tick_epoch) = ticks.recv() => {
                    // ticks queued by a cancelled schedule are dropped
                    if tick_epoch == epoch {
                        self.run_cycle().await;
                    }
                }
            }
        }

        self.state.stop();
        self.publish();
        tracing::info!(
            "Poll scheduler stopped after {} updates",
            self.state.poll().total_updates
        );
        self
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.state.poll().interval_ms)
    }

    fn publish(&self) {
        self.sink.publish(self.state.view(Utc::now()));
    }
}

fn require_object(raw: Value) -> Result<Value, SourceError> {
    if raw.is_object() {
        Ok(raw)
    } else {
        Err(SourceError::Parse("expected a JSON object".to_string()))
    }
}

/// Timer task for one schedule epoch; exits when its token is cancelled.
fn spawn_schedule(
    epoch: u64,
    period: Duration,
    immediate: bool,
    ticks: mpsc::Sender<u64>,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = if immediate {
            interval(period)
        } else {
            interval_at(Instant::now() + period, period)
        };
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if ticks.send(epoch).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Cloneable control surface for a running scheduler
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<PollScheduler>>>>,
}

impl SchedulerHandle {
    pub async fn reconfigure(&self, interval_ms: u64) -> Result<(), SchedulerError> {
        validate_interval(interval_ms)?;
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Reconfigure { interval_ms, reply })
            .await
            .map_err(|_| SchedulerError::Stopped)?;
        response.await.map_err(|_| SchedulerError::Stopped)?
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<(), SchedulerError> {
        self.commands
            .send(Command::SetTheme(theme))
            .await
            .map_err(|_| SchedulerError::Stopped)
    }

    /// Cancel the schedule. A cycle already in flight completes first.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop and wait for the task, returning the scheduler with its final
    /// state. Only the first caller gets it back.
    pub async fn shutdown(&self) -> Option<PollScheduler> {
        self.stop();
        let task = self.task.lock().await.take()?;
        match task.await {
            Ok(scheduler) => Some(scheduler),
            Err(e) => {
                tracing::error!("Poll scheduler task failed: {}", e);
                None
            }
        }
    }
}
