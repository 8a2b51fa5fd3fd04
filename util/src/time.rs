//! General time utility functions

use chrono;
use std::time::{Duration, Instant};

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a frequency in Hz into the period of one cycle.
///
/// Returns `None` for frequencies which are not finite and positive.
pub fn frequency_to_period(frequency_hz: f64) -> Option<std::time::Duration> {
    if frequency_hz.is_finite() && frequency_hz > 0.0 {
        Some(std::time::Duration::from_secs_f64(1.0 / frequency_hz))
    }
    else {
        None
    }
}

/// Sleep for what remains of a cycle which started at `cycle_start`.
///
/// Returns the overrun if the cycle has already taken longer than `period`, in which case no
/// sleep happens.
pub fn sleep_remaining(cycle_start: Instant, period: Duration) -> Option<Duration> {
    let cycle_dur = cycle_start.elapsed();

    match period.checked_sub(cycle_dur) {
        Some(d) => {
            std::thread::sleep(d);
            None
        },
        None => Some(cycle_dur - period)
    }
}
