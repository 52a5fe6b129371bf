pub mod progress;
pub mod scoring;
