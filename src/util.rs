//! Wall-clock helpers shared by the reactor (timer deadlines, clock-skew
//! detection) and the map (`rehash_for_ms`'s wall-clock budget).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall-clock time since the epoch. Used instead of `Instant` because the
/// reactor's clock-skew detection (spec.md §4.1) is explicitly about the
/// *wall* clock moving backward, which a monotonic `Instant` can't observe.
pub fn timestamp() -> Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO)
}

/// Current time as (seconds, milliseconds-within-the-second), the pair the
/// reactor stores per timer deadline (spec.md §3 Timer).
pub fn now_sec_ms() -> (i64, i64) {
    let t = timestamp();
    (t.as_secs() as i64, (t.subsec_millis()) as i64)
}

/// Current time in whole milliseconds since the epoch.
pub fn now_ms() -> i64 {
    timestamp().as_millis() as i64
}

/// `now_ms() + delta_ms`, the deadline computation `create_timer` performs.
pub fn add_ms_to_now(delta_ms: i64) -> i64 {
    now_ms() + delta_ms
}
