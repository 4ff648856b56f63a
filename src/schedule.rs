//! Cycle pacing against a monotonic clock.
//!
//! Cycle starts are spaced by the period no matter how long the sensor reads
//! take, so the loop does not drift the way `read; sleep(period)` would. A
//! cycle that runs past its successor's start re-anchors the schedule at the
//! current time instead of firing the missed cycles back to back.

use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSchedule {
    period_ms: u64,
    deadline_ms: u64,
}

impl CycleSchedule {
    /// Schedule whose first cycle starts at `now_ms`
    pub fn new(now_ms: u64, period_ms: u64) -> Self {
        Self {
            period_ms: period_ms.max(1),
            deadline_ms: now_ms,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Start time of the current cycle
    pub fn deadline_ms(&self) -> u64 {
        self.deadline_ms
    }

    /// Advance to the next cycle and return its start time.
    ///
    /// `now_ms` is the time the current cycle finished its work.
    pub fn next_deadline(&mut self, now_ms: u64) -> u64 {
        let next = self.deadline_ms + self.period_ms;
        if next < now_ms {
            warn!("cycle overran its period by {} ms", now_ms - next);
            self.deadline_ms = now_ms;
        } else {
            self.deadline_ms = next;
        }
        self.deadline_ms
    }
}
