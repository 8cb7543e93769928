//! Time utilities for the server

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Default tick period of a match (20 ticks per second)
pub const TICK_INTERVAL_MS: u64 = 50;

/// Returns true when `last` is unset or at least `cooldown` before `now`
pub fn cooldown_elapsed(last: Option<Instant>, now: Instant, cooldown: Duration) -> bool {
    match last {
        Some(last) => now.saturating_duration_since(last) >= cooldown,
        None => true,
    }
}
