// Presentation layer - HTTP surface over the published dashboard views
pub mod app_state;
pub mod handlers;
pub mod view_sink;
