// Application state for HTTP handlers
use crate::application::poll_scheduler::SchedulerHandle;
use crate::presentation::view_sink::ViewReceiver;

#[derive(Clone)]
pub struct AppState {
    pub views: ViewReceiver,
    pub scheduler: SchedulerHandle,
}
