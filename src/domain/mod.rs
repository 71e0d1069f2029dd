// Domain layer - Pure types and logic, no I/O
pub mod dashboard;
pub mod evaluation;
pub mod history;
pub mod quality;
pub mod sample;
