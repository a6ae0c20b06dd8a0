/// Small shared helpers used across the engine and transports.
///
/// IMPORTANT:
/// - No exchange-specific business logic should live here.
/// - This module must remain lightweight and deterministic.
///
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in microseconds, used to stamp
/// [`crate::messages::BboUpdate`] records at emission time.
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time is before UNIX_EPOCH")
        .as_micros() as u64
}
