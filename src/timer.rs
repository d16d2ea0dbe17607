//! One-shot timers for the control loop.
//!
//! Every timeout in the application (activation delay, call setup, call hold,
//! capture retry) is a deadline in this set. The control loop sleeps until the
//! nearest deadline and handles expirations before the next event. Timers
//! never auto-repeat; re-arming is always explicit.

use std::time::{Duration, Instant};

/// Identifies the single owner of each deadline slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerId {
    /// Delay between arming the monitor and it going live (also reused for
    /// the re-activation pause after a notification episode).
    Activation,
    /// Wait for the platform phone application to wind down before capture
    /// restarts.
    Resume,
    /// Bounds an outbound notification call: setup timeout before the call
    /// is answered, hold timeout afterwards.
    NotifyGuard,
    /// Bounds a manually taken incoming call.
    CallHold,
    /// Backoff before retrying a failed capture start.
    AudioRetry,
    /// Zero-delay slot used to stop capture on the next loop turn instead of
    /// from within chunk handling.
    SuspendCapture,
}

const TIMER_COUNT: usize = 6;

impl TimerId {
    const ALL: [TimerId; TIMER_COUNT] = [
        TimerId::Activation,
        TimerId::Resume,
        TimerId::NotifyGuard,
        TimerId::CallHold,
        TimerId::AudioRetry,
        TimerId::SuspendCapture,
    ];

    fn index(self) -> usize {
        match self {
            TimerId::Activation => 0,
            TimerId::Resume => 1,
            TimerId::NotifyGuard => 2,
            TimerId::CallHold => 3,
            TimerId::AudioRetry => 4,
            TimerId::SuspendCapture => 5,
        }
    }
}

/// A fixed set of one-shot, cancellable deadlines.
#[derive(Debug, Default)]
pub struct TimerSet {
    deadlines: [Option<Instant>; TIMER_COUNT],
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) a timer. An existing deadline is overwritten.
    pub fn arm(&mut self, id: TimerId, delay: Duration) {
        self.deadlines[id.index()] = Some(Instant::now() + delay);
    }

    pub fn cancel(&mut self, id: TimerId) {
        self.deadlines[id.index()] = None;
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.deadlines[id.index()].is_some()
    }

    /// The nearest armed deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().flatten().copied().min()
    }

    /// Remove and return the earliest deadline at or before `now`.
    ///
    /// Expired timers are drained one at a time so a handler that re-arms
    /// timers observes a consistent set.
    pub fn pop_expired(&mut self, now: Instant) -> Option<TimerId> {
        let mut winner: Option<(TimerId, Instant)> = None;
        for id in TimerId::ALL {
            if let Some(deadline) = self.deadlines[id.index()] {
                if deadline <= now && winner.map(|(_, best)| deadline < best).unwrap_or(true) {
                    winner = Some((id, deadline));
                }
            }
        }
        let (id, _) = winner?;
        self.deadlines[id.index()] = None;
        Some(id)
    }
}
