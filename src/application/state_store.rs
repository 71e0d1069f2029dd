// Persistence port for the few values that outlive a restart
use crate::domain::dashboard::Theme;
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

pub const THEME_KEY: &str = "theme";
pub const UPTIME_START_KEY: &str = "uptimeStart";
pub const TOTAL_UPDATES_KEY: &str = "totalUpdates";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key-value store with local-storage semantics
pub trait StateStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

pub fn load_total_updates(store: &dyn StateStore) -> u64 {
    match store.get(TOTAL_UPDATES_KEY) {
        Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring unreadable {} value {:?}", TOTAL_UPDATES_KEY, raw);
            0
        }),
        Ok(None) => 0,
        Err(e) => {
            tracing::warn!("Could not read {}: {}", TOTAL_UPDATES_KEY, e);
            0
        }
    }
}

pub fn save_total_updates(store: &mut dyn StateStore, total: u64) {
    if let Err(e) = store.set(TOTAL_UPDATES_KEY, &total.to_string()) {
        tracing::warn!("Could not persist {}: {}", TOTAL_UPDATES_KEY, e);
    }
}

/// Read the session start, recording `now` the first time. A stored value
/// is never moved.
pub fn load_or_init_session_start(store: &mut dyn StateStore, now: DateTime<Utc>) -> DateTime<Utc> {
    let stored = match store.get(UPTIME_START_KEY) {
        Ok(value) => value
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Err(e) => {
            tracing::warn!("Could not read {}: {}", UPTIME_START_KEY, e);
            None
        }
    };
    if let Some(start) = stored {
        return start;
    }

    let millis = now.timestamp_millis();
    if let Err(e) = store.set(UPTIME_START_KEY, &millis.to_string()) {
        tracing::warn!("Could not persist {}: {}", UPTIME_START_KEY, e);
    }
    Utc.timestamp_millis_opt(millis).single().unwrap_or(now)
}

pub fn load_theme(store: &dyn StateStore) -> Theme {
    match store.get(THEME_KEY) {
        Ok(Some(raw)) => Theme::parse(&raw).unwrap_or_default(),
        Ok(None) => Theme::default(),
        Err(e) => {
            tracing::warn!("Could not read {}: {}", THEME_KEY, e);
            Theme::default()
        }
    }
}

pub fn save_theme(store: &mut dyn StateStore, theme: Theme) {
    if let Err(e) = store.set(THEME_KEY, theme.as_str()) {
        tracing::warn!("Could not persist {}: {}", THEME_KEY, e);
    }
}
