// Fakes shared by unit tests
use crate::application::poll_scheduler::SchedulerSettings;
use crate::application::presentation_sink::PresentationSink;
use crate::application::sample_source::{SampleSource, SourceError};
use crate::domain::dashboard::DashboardView;
use crate::domain::evaluation::ThresholdTable;
use crate::domain::quality::ScoringPolicy;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn scheduler_settings(interval_ms: u64) -> SchedulerSettings {
    SchedulerSettings {
        interval_ms,
        history_capacity: 5,
        thresholds: ThresholdTable::default(),
        policy: ScoringPolicy::Ratio,
        trend_epsilon: 0.005,
    }
}

/// Replays scripted responses, then keeps answering with an undated reading
#[derive(Default)]
pub struct ScriptedSource {
    current: Mutex<VecDeque<Result<Value, SourceError>>>,
    history: Mutex<Option<Value>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedSource {
    pub fn with_current(responses: Vec<Result<Value, SourceError>>) -> Self {
        Self {
            current: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn with_history(self, history: Value) -> Self {
        *self.history.lock().unwrap() = Some(history);
        self
    }

    /// Every current-sample fetch takes this long to answer
    pub fn with_delay(self, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..self
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SampleSource for ScriptedSource {
    async fn fetch_current(&self) -> Result<Value, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.current
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "ph": 7.2, "turbidity": 1.0 })))
    }

    async fn fetch_history(&self) -> Result<Value, SourceError> {
        self.history
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| SourceError::Fetch("no history scripted".to_string()))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    views: Mutex<Vec<DashboardView>>,
}

impl RecordingSink {
    pub fn last(&self) -> DashboardView {
        self.views.lock().unwrap().last().cloned().expect("no view published")
    }

    pub fn count(&self) -> usize {
        self.views.lock().unwrap().len()
    }
}

impl PresentationSink for RecordingSink {
    fn publish(&self, view: DashboardView) {
        self.views.lock().unwrap().push(view);
    }
}
