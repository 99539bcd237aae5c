//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is live.
//!
//! # Tasks
//! - Memory pressure monitoring: samples usage and evicts under pressure
//! - Expiry sweep: removes idle entries at configured intervals

mod monitor;

pub use monitor::MemoryPressureMonitor;
pub use monitor::{EMERGENCY_REDUCTION_RATIO, MAX_ALERT_HISTORY, MAX_USAGE_SAMPLES};
