//! Shared utilities for TronGuard.

pub mod logging;
pub mod time;

pub use logging::{init_logging, LogFormat};
pub use time::{describe_expiry, format_duration};
