//! Terminal fault handling
//!
//! The device has no interactive error channel. Once a fault is judged
//! unrecoverable the affected unit of execution parks itself here so the
//! operator can inspect the logs; it never returns.

use std::time::Duration;
use tracing::error;

/// Interval between wake-ups while parked
pub const HALT_TICK: Duration = Duration::from_millis(1000);

/// Park the calling thread forever
///
/// Logs `reason` once, then sleeps in a loop. Used by bootstrap on fatal
/// faults and by background tasks that reach a terminal state.
pub fn halt_forever(reason: &str) -> ! {
    error!("Halting: {}", reason);
    loop {
        std::thread::sleep(HALT_TICK);
    }
}
