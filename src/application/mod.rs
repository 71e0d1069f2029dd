// Application layer - Ports and the polling use case
pub mod poll_scheduler;
pub mod presentation_sink;
pub mod sample_source;
pub mod state_store;
