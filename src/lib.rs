// The binary in main.rs is a thin terminal front-end over this library; the
// integration tests in tests/ drive the same modules.

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod generator;
pub mod session;
pub mod store;
