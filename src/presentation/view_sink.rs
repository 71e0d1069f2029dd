// Presentation sink backed by a watch channel that HTTP handlers read from
use crate::application::presentation_sink::PresentationSink;
use crate::domain::dashboard::DashboardView;
use std::sync::Arc;
use tokio::sync::watch;

pub type ViewReceiver = watch::Receiver<Option<Arc<DashboardView>>>;

pub struct WatchSink {
    tx: watch::Sender<Option<Arc<DashboardView>>>,
}

impl WatchSink {
    pub fn new() -> (Self, ViewReceiver) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }
}

impl PresentationSink for WatchSink {
    fn publish(&self, view: DashboardView) {
        tracing::debug!(
            "Publishing view: live={} samples={} updates={}",
            view.live,
            view.data_count,
            view.poll.total_updates
        );
        self.tx.send_replace(Some(Arc::new(view)));
    }
}
