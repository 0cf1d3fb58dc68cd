//! Compact monotonic time utilities.
//!
//! Expiry deadlines are absolute microsecond timestamps on a
//! process-local monotonic clock, which keeps heap cells at a plain
//! `u64` instead of a 16-byte `Instant`.

use std::sync::OnceLock;
use std::time::Instant;

/// Returns current monotonic time in microseconds since process start.
#[inline]
pub fn now_us() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_micros() as u64
}

/// Converts a TTL in milliseconds to an absolute deadline.
#[inline]
pub fn deadline_from_ttl_ms(ttl_ms: i64) -> u64 {
    now_us() + ttl_ms as u64 * 1000
}
