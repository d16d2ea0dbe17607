//! Reconciles asynchronous call notifications into a consistent lifecycle.
//!
//! The stack reports incoming calls, per-call status codes, and audio channel
//! connect/disconnect in an undefined but bounded order. This tracker folds
//! them into three flags and derives the lifecycle events the monitor acts
//! on. Pairing guarantees: every incoming call eventually yields `Finished`,
//! and `Established(true)` always pairs with a later `Established(false)`.

use super::{TelephonyBackend, STATUS_ALERTING, STATUS_TERMINATED};
use crate::log_debug;
use crate::timer::{TimerId, TimerSet};
use std::time::Duration;

/// Lifecycle events derived from raw telephony notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    /// An incoming call arrived and awaits a decision.
    Received(String),
    /// A call reached its terminal status, taken or not.
    Finished,
    /// The call audio channel came up (true) or went down (false). Only
    /// emitted for calls that were actually connected.
    Established(bool),
    /// A call this application answered itself has ended. Every successful
    /// take eventually produces exactly one of these.
    SelfCallFinished,
}

/// Tracks pending/established/taken call state.
pub struct CallTracker {
    /// Whether any phone call is currently active.
    call_active: bool,
    /// Whether a self-taken call is pending or shortly before pending.
    taken_call_pending: bool,
    /// Whether the next answerable status should trigger an answer.
    take_requested: bool,
    hold_timeout: Duration,
}

impl CallTracker {
    /// A fresh tracker assumes no call is pending at startup. The phone may
    /// actually be mid-call when the process starts; that goes unnoticed
    /// until the next status event, with limited negative effect.
    pub fn new(hold_timeout: Duration) -> Self {
        Self {
            call_active: false,
            taken_call_pending: false,
            take_requested: false,
            hold_timeout,
        }
    }

    pub fn call_active(&self) -> bool {
        self.call_active
    }

    pub fn taken_call_pending(&self) -> bool {
        self.taken_call_pending
    }

    /// An incoming call arrived. Any earlier take request is void; the new
    /// call needs its own decision.
    pub fn on_incoming(&mut self, caller: &str) -> Vec<CallEvent> {
        self.take_requested = false;
        vec![CallEvent::Received(caller.to_string())]
    }

    /// Answer the current call once it becomes answerable. The stack rejects
    /// an answer before the call reaches the alerting status, so the actual
    /// command is deferred until `on_status` observes one.
    pub fn request_take(&mut self) {
        self.take_requested = true;
    }

    /// Fold in a call status code.
    pub fn on_status(
        &mut self,
        status: u32,
        tel: &mut dyn TelephonyBackend,
        timers: &mut TimerSet,
    ) -> Vec<CallEvent> {
        let mut events = Vec::new();

        if self.take_requested && status >= STATUS_ALERTING {
            self.take_requested = false;
            if let Some(event) = self.take_now(tel, timers) {
                events.push(event);
            }
        }

        if status == STATUS_TERMINATED {
            log_debug("call finished");
            events.push(CallEvent::Finished);
        }

        events
    }

    /// Fold in an audio connect notification. `(true, true)` marks the call
    /// established, `(false, false)` marks it ended; mixed flags are
    /// transitional and ignored.
    pub fn on_audio_connect(
        &mut self,
        uplink: bool,
        downlink: bool,
        timers: &mut TimerSet,
    ) -> Vec<CallEvent> {
        if uplink && downlink {
            self.call_active = true;
            return vec![CallEvent::Established(true)];
        }
        if uplink || downlink {
            return Vec::new();
        }

        // End of call. The hold timer may or may not be running.
        timers.cancel(TimerId::CallHold);
        let mut events = Vec::new();
        if self.taken_call_pending {
            events.push(CallEvent::SelfCallFinished);
            self.taken_call_pending = false;
        }
        self.call_active = false;
        events.push(CallEvent::Established(false));
        events
    }

    /// Release the current call. Returns whether the stack accepted it.
    pub fn drop_call(&mut self, tel: &mut dyn TelephonyBackend) -> bool {
        match tel.release() {
            Ok(()) => {
                log_debug("call dropped");
                true
            }
            Err(err) => {
                log_debug(&format!("call release failed: {err:#}"));
                false
            }
        }
    }

    /// The hold timer expired: bound the call duration by force-dropping.
    pub fn on_hold_expired(&mut self, tel: &mut dyn TelephonyBackend) -> Vec<CallEvent> {
        log_debug("call hold timeout expired, dropping call");
        self.drop_call(tel);

        if self.taken_call_pending {
            self.taken_call_pending = false;
            return vec![CallEvent::SelfCallFinished];
        }
        Vec::new()
    }

    /// Issue the answer command now. On failure the caller still gets a
    /// `SelfCallFinished` so nobody is left waiting for a call that never
    /// happened.
    fn take_now(
        &mut self,
        tel: &mut dyn TelephonyBackend,
        timers: &mut TimerSet,
    ) -> Option<CallEvent> {
        match tel.answer() {
            Ok(()) => {
                log_debug("call taken");
                tracing::info!(target: "cribcall::telephony", "incoming call answered");
                self.taken_call_pending = true;
                timers.arm(TimerId::CallHold, self.hold_timeout);
                None
            }
            Err(err) => {
                log_debug(&format!("call answer failed: {err:#}"));
                Some(CallEvent::SelfCallFinished)
            }
        }
    }
}
