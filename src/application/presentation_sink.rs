// Port for handing processed state to whatever renders it
use crate::domain::dashboard::DashboardView;

/// Receives a fresh view after every cycle, successful or not.
pub trait PresentationSink: Send + Sync {
    fn publish(&self, view: DashboardView);
}
