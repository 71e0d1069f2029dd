// HTTP request handlers
use crate::application::poll_scheduler::SchedulerError;
use crate::domain::dashboard::{DashboardView, SchedulerPhase, Theme};
use crate::domain::history::export_snapshot;
use crate::infrastructure::http_response::{accepts_brotli, json_attachment_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use chrono::Utc;
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct IntervalRequest {
    pub interval_ms: u64,
}

#[derive(Deserialize)]
pub struct ThemeRequest {
    pub theme: Theme,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

fn latest_view(state: &AppState) -> Option<Arc<DashboardView>> {
    state.views.borrow().clone()
}

/// Current evaluations, score, history and poll state
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Response {
    match latest_view(&state) {
        Some(view) => Json(DashboardView::clone(&view)).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no data yet").into_response(),
    }
}

/// Server-sent events, one `view` event per published view. The stream ends
/// after the final view of a stopped scheduler so shutdown is not held up.
pub async fn stream_dashboard(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut views = state.views.clone();

    let stream = async_stream::stream! {
        loop {
            let current = views.borrow_and_update().clone();
            if let Some(view) = current {
                match Event::default().event("view").json_data(view.as_ref()) {
                    Ok(event) => yield Ok::<_, Infallible>(event),
                    Err(e) => tracing::warn!("Could not encode view event: {}", e),
                }
                if view.poll.phase == SchedulerPhase::Stopped {
                    break;
                }
            }
            if views.changed().await.is_err() {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Download the history snapshot as JSON
pub async fn export_history(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let snapshot = latest_view(&state)
        .map(|view| view.history.clone())
        .unwrap_or_default();

    let json = match export_snapshot(&snapshot) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("History export failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let filename = format!("water-quality-history-{}.json", Utc::now().format("%Y%m%dT%H%M%S"));
    match json_attachment_response(json, &filename, accepts_brotli(&headers)).await {
        Ok(response) => response.into_response(),
        Err(status) => status.into_response(),
    }
}

/// Change the polling interval at runtime
pub async fn put_interval(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IntervalRequest>,
) -> Response {
    match state.scheduler.reconfigure(request.interval_ms).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e @ SchedulerError::IntervalBelowFloor { .. }) => {
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
        }
        Err(e @ SchedulerError::Stopped) => {
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

pub async fn put_theme(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ThemeRequest>,
) -> Response {
    match state.scheduler.set_theme(request.theme).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}
