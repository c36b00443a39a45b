//! Shared utilities.

pub mod logging;
pub mod time;

pub use logging::init_tracing;
pub use time::{milliseconds_since_epoch, seconds_since_epoch};
