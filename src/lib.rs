// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod controller;
pub mod metrics;
pub mod passages;
pub mod runtime;
pub mod session;
pub mod store;
pub mod timer;
pub mod ui;
