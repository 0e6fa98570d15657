//! Logging and diagnostics.

pub mod debug;
pub mod logging;
