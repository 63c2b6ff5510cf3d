//! Cancellable release timer
//!
//! Each interrupt slot owns one of these. The timer only records a deadline;
//! whoever drives the engine decides when that deadline is reached and fires
//! it in two steps, [`ReleaseTimer::begin_fire`] then
//! [`ReleaseTimer::complete_fire`]. A cancellation landing between the two
//! cannot stop the fire any more, so it is recorded in a suppression flag
//! that the completing step consults.

use embassy_time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerState {
    Idle,
    Scheduled(Instant),
    Firing,
}

/// Outcome of [`ReleaseTimer::cancel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CancelResult {
    /// A pending deadline was removed
    Cancelled,
    /// Nothing was scheduled
    Idle,
    /// The timer is already firing; the fire will be suppressed
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseTimer {
    state: TimerState,
    suppressed: bool,
}

impl ReleaseTimer {
    pub const fn new() -> Self {
        Self {
            state: TimerState::Idle,
            suppressed: false,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Pending deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TimerState::Scheduled(at) => Some(at),
            _ => None,
        }
    }

    /// Arm (or re-arm) the timer for `at`, replacing any earlier deadline
    pub fn schedule(&mut self, at: Instant) {
        self.state = TimerState::Scheduled(at);
        self.suppressed = false;
    }

    pub fn cancel(&mut self) -> CancelResult {
        match self.state {
            TimerState::Idle => CancelResult::Idle,
            TimerState::Scheduled(_) => {
                self.state = TimerState::Idle;
                CancelResult::Cancelled
            }
            TimerState::Firing => {
                self.suppressed = true;
                CancelResult::InProgress
            }
        }
    }

    /// Start firing if the deadline has been reached
    pub fn begin_fire(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::Scheduled(at) if at <= now => {
                self.state = TimerState::Firing;
                true
            }
            _ => false,
        }
    }

    /// Finish a fire started with [`Self::begin_fire`].
    ///
    /// Returns true if the fire should take effect: it was neither cancelled
    /// nor re-armed in the meantime.
    pub fn complete_fire(&mut self) -> bool {
        match self.state {
            TimerState::Firing => {
                self.state = TimerState::Idle;
                !core::mem::take(&mut self.suppressed)
            }
            _ => false,
        }
    }

    /// Drop any deadline and suppression, e.g. when the slot is reused
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for ReleaseTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn test_fire_after_deadline() {
        let mut timer = ReleaseTimer::new();
        timer.schedule(at(250));
        assert!(!timer.begin_fire(at(249)));
        assert!(timer.begin_fire(at(250)));
        assert!(timer.complete_fire());
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn test_cancel_scheduled() {
        let mut timer = ReleaseTimer::new();
        timer.schedule(at(100));
        assert_eq!(timer.cancel(), CancelResult::Cancelled);
        assert!(!timer.begin_fire(at(500)));
        assert_eq!(timer.cancel(), CancelResult::Idle);
    }

    #[test]
    fn test_cancel_while_firing_suppresses() {
        let mut timer = ReleaseTimer::new();
        timer.schedule(at(100));
        assert!(timer.begin_fire(at(100)));
        assert_eq!(timer.cancel(), CancelResult::InProgress);
        assert!(!timer.complete_fire());
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn test_suppression_cleared_by_next_fire() {
        let mut timer = ReleaseTimer::new();
        timer.schedule(at(100));
        timer.begin_fire(at(100));
        timer.cancel();
        timer.complete_fire();

        timer.schedule(at(300));
        assert!(timer.begin_fire(at(300)));
        assert!(timer.complete_fire());
    }

    #[test]
    fn test_reschedule_while_firing_is_stale() {
        let mut timer = ReleaseTimer::new();
        timer.schedule(at(100));
        timer.begin_fire(at(100));
        timer.schedule(at(400));
        assert!(!timer.complete_fire());
        assert_eq!(timer.deadline(), Some(at(400)));
    }

    #[test]
    fn test_reschedule_replaces_deadline() {
        let mut timer = ReleaseTimer::new();
        timer.schedule(at(100));
        timer.schedule(at(300));
        assert!(!timer.begin_fire(at(200)));
        assert_eq!(timer.deadline(), Some(at(300)));
    }
}
