//! Shared utilities for council-rs

pub mod logging;

pub use logging::{init_tracing, init_tracing_json};
